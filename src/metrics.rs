use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("phonebook_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMIT_REJECTIONS: Counter = register_counter!(
        "phonebook_rate_limit_rejections_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref RATE_LIMIT_BACKEND_ERRORS: Counter = register_counter!(
        "phonebook_rate_limit_backend_errors_total",
        "Rate limit checks that could not reach the store"
    )
    .unwrap();
    pub static ref STORE_ERRORS: Counter =
        register_counter!("phonebook_store_errors_total", "Failed store calls in handlers").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "phonebook_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}
