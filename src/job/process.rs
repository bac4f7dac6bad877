use super::{Pid, Signal, Status};
use crate::parse::Stage;
use crate::Error;

use anyhow::Context;
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc;
use nix::sys::signal::{signal, SigHandler, SigSet};
use nix::sys::stat::Mode;
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, fork, setpgid, ForkResult};
use std::ffi::{CStr, CString};
use std::os::fd::RawFd;
use std::os::raw::c_char;

const EXIT_REDIRECT: i32 = 1;
const EXIT_EXEC: i32 = 127;

const DEFAULT_SIGNALS: [Signal; 7] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
    Signal::SIGCHLD,
    Signal::SIGPIPE,
];

/// Where a child's standard streams come from before its own redirections
/// are applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wiring {
    /// Read end of the previous stage's pipe.
    pub stdin: Option<RawFd>,
    /// Write end of this stage's pipe.
    pub stdout: Option<RawFd>,
    /// Read end of this stage's pipe; the child closes it.
    pub spare: Option<RawFd>,
    /// Process group to join. `Pid(0)` starts a new group led by the child.
    pub pgid: Option<Pid>,
}

/// A stage converted to the C strings `execvp` needs.
///
/// Everything is allocated up front: between `fork` and `execvp` the child
/// only makes async-signal-safe calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    argv: Vec<CString>,
    stdin: Option<CString>,
    stdout: Option<CString>,
}

impl Program {
    pub fn new(stage: &Stage) -> anyhow::Result<Self> {
        let argv = stage
            .args()
            .iter()
            .map(|arg| cstring(arg))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let stdin = stage.stdin().map(|p| cstring(&p.to_string_lossy())).transpose()?;
        let stdout = stage.stdout().map(|p| cstring(&p.to_string_lossy())).transpose()?;
        Ok(Self {
            argv,
            stdin,
            stdout,
        })
    }

    pub fn name(&self) -> &CStr {
        &self.argv[0]
    }

    /// Fork a child that wires itself up and execs this program.
    ///
    /// Only `fork` failing is reported here. A missing program or an
    /// unopenable redirection shows up as the child's exit status.
    pub fn spawn(&self, wiring: &Wiring) -> anyhow::Result<Pid> {
        let mut argv: Vec<*const c_char> = self.argv.iter().map(|arg| arg.as_ptr()).collect();
        argv.push(std::ptr::null());

        // SAFETY: the child branch never returns and only calls
        // async-signal-safe functions before exec or _exit.
        match unsafe { fork() }.map_err(Error::Fork)? {
            ForkResult::Child => self.exec(&argv, wiring),
            ForkResult::Parent { child } => {
                if let Some(pgid) = wiring.pgid {
                    let pgid = if pgid.as_raw() == 0 { child } else { pgid };
                    // Racing the child's own call; EACCES after exec is fine.
                    if let Err(e) = setpgid(child, pgid) {
                        tracing::trace!(%child, %pgid, "setpgid from parent: {}", e);
                    }
                }
                tracing::debug!(pid = %child, program = ?self.name(), "spawned");
                Ok(child)
            }
        }
    }

    fn exec(&self, argv: &[*const c_char], wiring: &Wiring) -> ! {
        if let Some(pgid) = wiring.pgid {
            let _ = setpgid(Pid::from_raw(0), pgid);
        }
        if let Some(fd) = wiring.spare {
            let _ = close(fd);
        }
        if let Some(fd) = wiring.stdin {
            if let Err(e) = move_fd(fd, libc::STDIN_FILENO) {
                die(self.name(), e, EXIT_REDIRECT);
            }
        }
        if let Some(fd) = wiring.stdout {
            if let Err(e) = move_fd(fd, libc::STDOUT_FILENO) {
                die(self.name(), e, EXIT_REDIRECT);
            }
        }

        // File redirections override the pipe ends.
        if let Some(path) = &self.stdin {
            let res = open(path.as_c_str(), OFlag::O_RDONLY, Mode::empty())
                .and_then(|fd| move_fd(fd, libc::STDIN_FILENO));
            if let Err(e) = res {
                die(path, e, EXIT_REDIRECT);
            }
        }
        if let Some(path) = &self.stdout {
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
            let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
            let res = open(path.as_c_str(), flags, mode)
                .and_then(|fd| move_fd(fd, libc::STDOUT_FILENO));
            if let Err(e) = res {
                die(path, e, EXIT_REDIRECT);
            }
        }

        for sig in DEFAULT_SIGNALS {
            // SAFETY: restoring the default disposition installs no handler.
            let _ = unsafe { signal(sig, SigHandler::SigDfl) };
        }
        let _ = SigSet::empty().thread_set_mask();

        // SAFETY: argv is NULL-terminated and its strings outlive the call.
        unsafe { libc::execvp(self.argv[0].as_ptr(), argv.as_ptr()) };
        die(self.name(), Errno::last(), EXIT_EXEC)
    }
}

/// Wait for `pid` to terminate.
///
/// `None` means the child was already collected elsewhere (by the reaper).
pub fn wait(pid: Pid) -> anyhow::Result<Option<Status>> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(status) = Status::from_wait(status) {
                    return Ok(Some(status));
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to wait for process {}.", pid))
            }
        }
    }
}

fn cstring(s: &str) -> anyhow::Result<CString> {
    CString::new(s).map_err(|_| Error::NulByte(s.to_string()).into())
}

fn move_fd(src: RawFd, dst: RawFd) -> nix::Result<()> {
    if src != dst {
        dup2(src, dst)?;
        close(src)?;
    }
    Ok(())
}

/// Report a child-side failure on the child's stderr and exit.
fn die(what: &CStr, errno: Errno, code: i32) -> ! {
    let reason = if code == EXIT_EXEC && errno == Errno::ENOENT {
        "command not found"
    } else {
        errno.desc()
    };
    let parts: [&[u8]; 5] = [b"pish: ", what.to_bytes(), b": ", reason.as_bytes(), b"\n"];
    for part in parts {
        // SAFETY: plain write(2) of a live buffer to stderr.
        let _ = unsafe { libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len()) };
    }
    // SAFETY: _exit skips atexit handlers and buffered stdio of the parent image.
    unsafe { libc::_exit(code) }
}
