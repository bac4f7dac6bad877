use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Exited(i32),
    Signaled(Signal),
}

impl Status {
    /// Terminal states only; stops and continues map to `None`.
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::Exited(code)),
            WaitStatus::Signaled(_, sig, _) => Some(Self::Signaled(sig)),
            _ => None,
        }
    }

    /// Shell-style exit code: the exit status, or 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(c) => *c,
            Self::Signaled(s) => 128 + *s as i32,
        }
    }

    pub fn success(&self) -> bool {
        *self == Self::Exited(0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Exited(c) => write!(f, "exited: {}", c),
            Status::Signaled(s) => write!(f, "signaled: {}", s),
        }
    }
}
