mod docs;
mod metrics;
mod phonebook;
mod status;

pub use docs::docs_handler;
pub use metrics::metrics_handler;
pub use phonebook::{read_data_handler, write_data_handler};
pub use status::status_handler;
