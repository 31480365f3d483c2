//! Client for the remote graph store's HTTP API. The [`GraphBackend`] and
//! [`BackendSession`] traits are the seam the core consumes; the store's
//! wire protocol never leaks past this crate.

mod api;
mod error;
mod http;

pub use api::BackendSession;
pub use api::GraphBackend;
pub use api::QueryResponse;
pub use api::attributes;
pub use error::BackendError;
pub use http::BackendOptions;
pub use http::HttpBackendClient;
