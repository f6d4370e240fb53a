//! Teardown shared types.
//!
//! Error taxonomy and constants used by the teardown pipeline and by the
//! collaborator implementations plugged into it.

pub mod constants;
pub mod errors;

pub use errors::{ErrorKind, TeardownError, TeardownResult, TeardownStep};
