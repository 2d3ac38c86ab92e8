pub mod api;
pub mod arguments;
pub mod deployment;
pub mod heartbeat;
pub mod infra;
pub mod record;
pub mod run;

pub use self::run::{run, start};
