//! HTTP surface of reticle: profile submission and health.
mod error;
pub use error::{ApiError, SUBMISSION_FAILED};

mod handler;
pub use handler::ApiHandler;

mod adapter;
pub use adapter::ProvisionerAdapter;

mod http;
pub use http::HttpApi;
