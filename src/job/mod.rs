mod jobs;
mod process;
mod status;
mod terminal;

pub use jobs::{Job, JobId, JobRegistry, Jobs};
pub use nix::sys::signal::Signal;
pub use nix::unistd::Pid;
pub use process::{wait, Program, Wiring};
pub use status::Status;
pub use terminal::Terminal;
