pub mod config;
mod error;
pub mod eval;
pub mod job;
pub mod parse;
pub mod session;
mod sighook;

pub use config::Config;
pub use error::Error;
pub use eval::{Flow, Shell};
pub use job::{Job, JobId, JobRegistry, Status};
pub use sighook::Reaper;
