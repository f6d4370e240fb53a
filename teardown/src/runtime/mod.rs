pub mod constants;
pub mod layout;
pub mod options;
pub mod types;

pub(crate) mod core;
pub use self::core::{Daemon, DaemonBuilder};
