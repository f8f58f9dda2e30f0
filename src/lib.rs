//! Library crate for portscan-rs: scan dispatcher, result store and the submit/query API.
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod ports;
pub mod probe;
pub mod server;
pub mod store;
pub mod types;
