//! Business logic behind the HTTP handlers.

pub mod rpc;
pub mod stream;
