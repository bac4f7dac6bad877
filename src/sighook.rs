use crate::job::JobRegistry;

use anyhow::Context;
use signal_hook::consts::signal;
use signal_hook::iterator::{Handle, Signals};
use std::thread::{self, JoinHandle};

/// Background thread that collects finished children on SIGCHLD and keeps
/// SIGINT from killing the interpreter.
///
/// Dropping it stops the thread.
pub struct Reaper {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Reaper {
    pub fn spawn(jobs: &JobRegistry) -> anyhow::Result<Self> {
        let mut signals = Signals::new([signal::SIGCHLD, signal::SIGINT])
            .context("Failed to initialize signals.")?;
        let handle = signals.handle();

        let jobs = jobs.clone();
        let thread = thread::Builder::new()
            .name("reaper".into())
            .spawn(move || {
                for sig in signals.forever() {
                    match sig {
                        signal::SIGCHLD => match jobs.reap() {
                            Ok(done) if !done.is_empty() => {
                                tracing::debug!(count = done.len(), "jobs reaped")
                            }
                            Ok(_) => (),
                            Err(e) => tracing::warn!("reaper: {:#}", e),
                        },
                        signal::SIGINT => eprintln!(),
                        _ => unreachable!(),
                    }
                }
                tracing::trace!("reaper stopped");
            })
            .context("Failed to start the reaper thread.")?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("reaper thread panicked");
            }
        }
    }
}
