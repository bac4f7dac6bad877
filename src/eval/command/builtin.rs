use crate::eval::Flow;
use crate::job::{self, JobId, JobRegistry, Signal, Terminal};
use crate::Error;

use anyhow::Context;
use nix::errno::Errno;
use nix::sys::signal::killpg;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builtin {
    kind: BuiltinKind,
    args: Vec<String>,
}

impl Builtin {
    pub fn new<T, TS>(kind: BuiltinKind, args: TS) -> Self
    where
        T: Into<String>,
        TS: IntoIterator<Item = T>,
    {
        Self {
            kind,
            args: args.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub fn kind(&self) -> BuiltinKind {
        self.kind
    }

    pub fn eval<W: Write + ?Sized>(&self, jobs: &JobRegistry, out: &mut W) -> anyhow::Result<Flow> {
        match self.kind {
            BuiltinKind::Exit => return exit(&self.args),
            BuiltinKind::Cd => cd(&self.args)?,
            BuiltinKind::Jobs => list(jobs, out)?,
            BuiltinKind::Fg => fg(&self.args, jobs, out)?,
            BuiltinKind::Bg => bg(&self.args, jobs)?,
        }

        Ok(Flow::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Exit,
    Cd,
    Jobs,
    Fg,
    Bg,
}

impl BuiltinKind {
    pub fn new<T: AsRef<str>>(name: T) -> Option<Self> {
        Some(match name.as_ref() {
            "exit" => Self::Exit,
            "cd" => Self::Cd,
            "jobs" => Self::Jobs,
            "fg" => Self::Fg,
            "bg" => Self::Bg,
            _ => return None,
        })
    }
}

pub fn exit<T: AsRef<str>>(args: &[T]) -> anyhow::Result<Flow> {
    let code = match args {
        [] => 0,
        [code] => code
            .as_ref()
            .parse::<i32>()
            .context("exit: Failed to parse a number.")?,
        _ => {
            return Err(Error::Usage {
                builtin: "exit",
                usage: "exit [code]",
            }
            .into())
        }
    };
    Ok(Flow::Exit(code))
}

pub fn cd<T: AsRef<str>>(args: &[T]) -> anyhow::Result<()> {
    let path = match args {
        [path] => path.as_ref(),
        _ => {
            return Err(Error::Usage {
                builtin: "cd",
                usage: "cd <dir>",
            }
            .into())
        }
    };

    std::env::set_current_dir(path).with_context(|| format!("cd: {}", path))?;
    tracing::debug!(path, "changed directory");

    Ok(())
}

pub fn list<W: Write + ?Sized>(jobs: &JobRegistry, out: &mut W) -> anyhow::Result<()> {
    for job in jobs.list()? {
        writeln!(out, "{}", job)?;
    }
    Ok(())
}

/// Continue a job in the foreground and wait for its leader to finish.
pub fn fg<T: AsRef<str>, W: Write + ?Sized>(
    args: &[T],
    jobs: &JobRegistry,
    out: &mut W,
) -> anyhow::Result<()> {
    let id = job_id("fg", "fg <job_id>", args)?;
    let job = jobs
        .find(id)?
        .ok_or(Error::NoSuchJob { builtin: "fg", id: id.0 })?;

    writeln!(out, "{}", job.text)?;
    out.flush()?;

    let terminal = Terminal::stdin();
    if let Some(terminal) = &terminal {
        if let Err(e) = terminal.give_to(job.pgid) {
            tracing::warn!("fg: {:#}", e);
        }
    }

    tracing::debug!(id = %job.id, pgid = %job.pgid, "continuing job in the foreground");
    continue_group(job.pgid).context("fg: Failed to continue the job.")?;
    let status = job::wait(job.pid);

    if let Some(terminal) = &terminal {
        if let Err(e) = terminal.reclaim() {
            tracing::warn!("fg: {:#}", e);
        }
    }

    // The reaper may have removed it already.
    jobs.remove(job.pid)?;
    let status = status?;
    tracing::debug!(id = %job.id, ?status, "foreground job done");

    Ok(())
}

/// Continue a job without waiting for it.
pub fn bg<T: AsRef<str>>(args: &[T], jobs: &JobRegistry) -> anyhow::Result<()> {
    let id = job_id("bg", "bg <job_id>", args)?;
    let job = jobs
        .find(id)?
        .ok_or(Error::NoSuchJob { builtin: "bg", id: id.0 })?;

    tracing::debug!(id = %job.id, pgid = %job.pgid, "continuing job in the background");
    continue_group(job.pgid).context("bg: Failed to continue the job.")?;
    Ok(())
}

fn job_id<T: AsRef<str>>(
    builtin: &'static str,
    usage: &'static str,
    args: &[T],
) -> anyhow::Result<JobId> {
    let arg = match args {
        [arg] => arg.as_ref(),
        _ => return Err(Error::Usage { builtin, usage }.into()),
    };

    arg.strip_prefix('%')
        .unwrap_or(arg)
        .parse::<usize>()
        .map(JobId)
        .map_err(|_| {
            Error::InvalidJobId {
                builtin,
                arg: arg.to_string(),
            }
            .into()
        })
}

// A group whose members have all exited is not an error.
fn continue_group(pgid: job::Pid) -> nix::Result<()> {
    match killpg(pgid, Signal::SIGCONT) {
        Err(Errno::ESRCH) => Ok(()),
        res => res,
    }
}
