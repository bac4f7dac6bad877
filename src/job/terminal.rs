use super::{Pid, Signal};

use anyhow::Context;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::SigSet;
use nix::unistd::getpgrp;
use std::io::IsTerminal;
use std::os::fd::RawFd;

/// The controlling terminal on stdin, when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminal {
    fd: RawFd,
}

impl Terminal {
    pub fn stdin() -> Option<Self> {
        if std::io::stdin().is_terminal() {
            Some(Self {
                fd: libc::STDIN_FILENO,
            })
        } else {
            None
        }
    }

    /// Make `pgid` the foreground process group.
    pub fn give_to(&self, pgid: Pid) -> anyhow::Result<()> {
        self.set_foreground(pgid)
            .with_context(|| format!("Failed to hand the terminal to group {}.", pgid))
    }

    /// Take the terminal back for the interpreter's own group.
    pub fn reclaim(&self) -> anyhow::Result<()> {
        self.set_foreground(getpgrp())
            .context("Failed to reclaim the terminal.")
    }

    // SIGTTOU stays blocked around the call: once the terminal has been
    // handed away the interpreter is a background group.
    fn set_foreground(&self, pgid: Pid) -> anyhow::Result<()> {
        let mut ttou = SigSet::empty();
        ttou.add(Signal::SIGTTOU);
        ttou.thread_block().context("Failed to block SIGTTOU.")?;

        // SAFETY: tcsetpgrp only reads its integer arguments.
        let res = Errno::result(unsafe { libc::tcsetpgrp(self.fd, pgid.as_raw()) });

        ttou.thread_unblock().context("Failed to unblock SIGTTOU.")?;
        res?;
        Ok(())
    }
}
