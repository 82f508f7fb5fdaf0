// Routing table
//
// GET  /             status + version        rate limited
// POST /write_data   save phone -> address   rate limited
// GET  /write_data   look up a phone         rate limited
// GET  /metrics      prometheus text
// GET  /docs /redoc  this table (ENV=test only)
//
// Middleware runs outermost first: fault_boundary, then the rate limiter
// on the limited routes, then the handler.

use axum::{Router, middleware, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::handlers::{
    docs_handler, metrics_handler, read_data_handler, status_handler, write_data_handler,
};
use crate::middleware::fault_boundary;
use crate::rate_limit;
use crate::state::AppState;

#[derive(Serialize, Debug)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub rate_limited: bool,
    pub summary: &'static str,
}

pub const ROUTES: &[RouteDoc] = &[
    RouteDoc {
        method: "GET",
        path: "/",
        rate_limited: true,
        summary: "service status and version",
    },
    RouteDoc {
        method: "POST",
        path: "/write_data",
        rate_limited: true,
        summary: "store an address for a phone, overwriting any previous one",
    },
    RouteDoc {
        method: "GET",
        path: "/write_data",
        rate_limited: true,
        summary: "look up the address stored for ?phone=",
    },
    RouteDoc {
        method: "GET",
        path: "/metrics",
        rate_limited: false,
        summary: "prometheus metrics",
    },
    RouteDoc {
        method: "GET",
        path: "/docs",
        rate_limited: false,
        summary: "route table, only served when ENV=test",
    },
    RouteDoc {
        method: "GET",
        path: "/redoc",
        rate_limited: false,
        summary: "same as /docs, only served when ENV=test",
    },
];

pub fn build_router(state: Arc<AppState>) -> Router {
    // route_layer only wraps routes registered before it
    let router = Router::new()
        .route("/", get(status_handler))
        .route("/write_data", get(read_data_handler).post(write_data_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .route("/metrics", get(metrics_handler));

    let router = if state.docs_enabled {
        router
            .route("/docs", get(docs_handler))
            .route("/redoc", get(docs_handler))
    } else {
        router
    };

    router
        .layer(middleware::from_fn(fault_boundary))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailurePolicy, RATE_LIMIT_TIMES, RATE_LIMIT_WINDOW};
    use crate::rate_limit::RateLimiter;
    use crate::store::{MemoryStore, Store};
    use crate::test_support::{SingleKeyspaceStore, UnreachableStore};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app_with(store: Arc<dyn Store>, policy: FailurePolicy, docs_enabled: bool) -> Router {
        let limiter = RateLimiter::new(store.clone(), RATE_LIMIT_TIMES, RATE_LIMIT_WINDOW, policy);
        build_router(Arc::new(AppState::new(store, limiter, docs_enabled)))
    }

    fn app() -> Router {
        app_with(Arc::new(MemoryStore::new()), FailurePolicy::Open, false)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn write_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/write_data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn status_reports_ok_and_version() {
        let response = app().oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "OK", "version": "1.0" })
        );
    }

    #[tokio::test]
    async fn write_then_read_returns_the_address() {
        let app = app();

        let response = app
            .clone()
            .oneshot(write_request(
                json!({ "phone": "89090000000", "address": "Moscow" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["message"].is_string());

        let response = app
            .oneshot(get_request("/write_data?phone=89090000000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "phone": "89090000000", "address": "Moscow" })
        );
    }

    #[tokio::test]
    async fn second_write_overwrites_the_first() {
        let app = app();

        for address in ["Moscow", "Saint Petersburg"] {
            let response = app
                .clone()
                .oneshot(write_request(
                    json!({ "phone": "89090000001", "address": address }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(get_request("/write_data?phone=89090000001"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["address"], "Saint Petersburg");
    }

    #[tokio::test]
    async fn unknown_phone_is_not_found() {
        let response = app()
            .oneshot(get_request("/write_data?phone=00000000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Phone number not found" })
        );
    }

    #[tokio::test]
    async fn eleventh_request_in_a_window_is_rate_limited() {
        let app = app();

        for i in 1..=10 {
            let response = app.clone().oneshot(get_request("/")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "request {i}");
        }

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "Too Many Requests" })
        );
    }

    #[tokio::test]
    async fn rejected_request_never_reaches_the_handler() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let app = app_with(store.clone(), FailurePolicy::Open, false);

        for i in 0..=RATE_LIMIT_TIMES {
            app.clone()
                .oneshot(write_request(
                    json!({ "phone": "89090000002", "address": format!("v{i}") }),
                ))
                .await
                .unwrap();
        }

        // the 11th write was turned away, so the 10th value survives
        assert_eq!(
            store.get("phone:89090000002").await.unwrap().as_deref(),
            Some("v9")
        );
    }

    #[tokio::test]
    async fn phone_shaped_like_a_counter_key_cannot_reset_the_limit() {
        let store: Arc<dyn Store> = Arc::new(SingleKeyspaceStore::default());
        let app = app_with(store.clone(), FailurePolicy::Open, false);
        let counter_key = format!("{}:unknown:/", rate_limit::KEY_PREFIX);

        let response = app
            .clone()
            .oneshot(write_request(json!({ "phone": &counter_key, "address": "x" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for i in 1..=RATE_LIMIT_TIMES {
            let response = app.clone().oneshot(get_request("/")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "request {i}");
        }
        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        assert_eq!(
            store.get(&format!("phone:{counter_key}")).await.unwrap().as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let app = app();

        for _ in 0..RATE_LIMIT_TIMES {
            let mut request = get_request("/");
            request
                .headers_mut()
                .insert("x-forwarded-for", "198.51.100.1".parse().unwrap());
            app.clone().oneshot(request).await.unwrap();
        }

        let mut request = get_request("/");
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.2".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn concurrent_writes_to_distinct_phones_do_not_interfere() {
        let app = app();

        // a distinct client per write keeps every request under its own limit
        let tasks: Vec<_> = (0..25)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let mut request = write_request(json!({
                        "phone": format!("8909000{i:04}"),
                        "address": format!("street {i}"),
                    }));
                    request
                        .headers_mut()
                        .insert("x-forwarded-for", format!("10.1.0.{i}").parse().unwrap());
                    app.oneshot(request).await.unwrap().status()
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), StatusCode::OK);
        }

        for i in 0..25 {
            let mut request = get_request(&format!("/write_data?phone=8909000{i:04}"));
            request
                .headers_mut()
                .insert("x-forwarded-for", format!("10.2.0.{i}").parse().unwrap());
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(json_body(response).await["address"], format!("street {i}"));
        }
    }

    #[tokio::test]
    async fn malformed_request_is_a_client_error() {
        let store: Arc<dyn Store> = Arc::new(UnreachableStore);
        let app = app_with(store, FailurePolicy::Open, false);

        let response = app
            .clone()
            .oneshot(write_request(json!({ "phone": "89090000000" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app.oneshot(get_request("/write_data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let app = app_with(Arc::new(UnreachableStore), FailurePolicy::Open, false);

        // fail-open lets the request through, then the handler's own store call fails
        let response = app
            .clone()
            .oneshot(get_request("/write_data?phone=89090000000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fail_closed_rejects_everything_during_outage() {
        let app = app_with(Arc::new(UnreachableStore), FailurePolicy::Closed, false);

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "Rate limiter unavailable" })
        );
    }

    #[tokio::test]
    async fn metrics_are_not_rate_limited() {
        let app = app();

        for _ in 0..=RATE_LIMIT_TIMES {
            let response = app.clone().oneshot(get_request("/metrics")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn docs_only_routed_when_enabled() {
        let hidden = app_with(Arc::new(MemoryStore::new()), FailurePolicy::Open, false);
        for path in ["/docs", "/redoc"] {
            let response = hidden.clone().oneshot(get_request(path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }

        let shown = app_with(Arc::new(MemoryStore::new()), FailurePolicy::Open, true);
        let response = shown.clone().oneshot(get_request("/redoc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = shown.oneshot(get_request("/docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["routes"].as_array().unwrap().len(), ROUTES.len());
        assert_eq!(body["rate_limit"]["times"], RATE_LIMIT_TIMES);
        assert_eq!(body["rate_limit"]["failure_policy"], "open");
    }
}
