//! # exewarden gateway
//!
//! Outward face of the supervisor.
//!
//! This crate provides:
//! - [`StatusGateway`]: query/start/stop answered as plain status values
//! - [`ExecutableLocator`]: which executable a start launches
//! - The axum HTTP API (`/api/status`, `/api/start`, `/api/stop`) and its server

pub mod api;
pub mod gateway;
pub mod locator;
pub mod server;
pub mod types;

// Re-export commonly used items
pub use gateway::StatusGateway;
pub use locator::ExecutableLocator;
pub use server::GatewayServer;
pub use types::{CommandResponse, CommandStatus, StatusSnapshot};
