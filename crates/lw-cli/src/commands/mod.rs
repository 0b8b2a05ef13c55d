//! CLI subcommand implementations.

pub mod clock;
pub mod delete;
pub mod history;
pub mod status;
pub mod util;
pub mod watch;
