//! Nisab Proxy Library
//!
//! A read-through cache over the IslamicAPI nisab endpoint with a locally
//! computed fallback. The binary wraps [`server::create_router`]; the modules are
//! exposed for integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod proxy;
pub mod server;
