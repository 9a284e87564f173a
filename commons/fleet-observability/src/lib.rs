pub mod http;
pub mod tracing;

pub use http::serve_probes;
pub use tracing::{TracingConfig, setup_tracing};
