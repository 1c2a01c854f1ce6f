pub mod classify;
pub mod core;
pub mod error;
pub mod handler;

pub use crate::core::{Core, CoreConfig, CoreState, DEFAULT_BODY_LIMIT, DEFAULT_ROUTE};
pub use error::ProxyError;
