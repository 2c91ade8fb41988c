//! HTTP adapter over the order engine
//!
//! A thin translator: requests are resolved against the catalog and the configured
//! defaults, then handed to [`OrderEngine`](order_flow::OrderEngine). Engine rejections map
//! onto status codes in [`error`].

mod error;
mod router;
mod state;

pub use error::HttpError;
pub use router::build_router;
pub use state::{OrderDefaults, ServeState};
