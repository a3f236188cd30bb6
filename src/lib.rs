// The binary entry point is main.rs; the session engine lives here so that
// integration tests and criterion benches can drive it directly.

pub mod config;
pub mod deck;
pub mod engine;
pub mod error;
pub mod session;
pub mod store;
