//! # exewarden common
//!
//! Types shared by every exewarden crate: the supervisor error taxonomy and
//! the identifiers used to tell one supervised run from the next.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{SupervisorError, SupervisorResult};
pub use types::RunId;
