//! gateway-core: shared infrastructure for the catalog gateway.
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod utils;

pub use axum;
pub use serde;
pub use serde_json;
pub use tracing;
pub use validator;
