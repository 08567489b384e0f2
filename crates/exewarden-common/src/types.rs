//! Identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one supervised run.
///
/// Every successful start gets a fresh id. Background tasks carry the id of
/// the run they were spawned for, so a task that outlives its run can tell
/// that the slot now belongs to someone else.
///
/// ```
/// use exewarden_common::RunId;
///
/// let first = RunId::first();
/// assert_eq!(first.next().as_u64(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}
