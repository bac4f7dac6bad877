use crate::job::{self, Job, JobRegistry, Pid, Program, Signal, Status, Wiring};
use crate::parse::Pipeline;
use crate::Error;

use anyhow::Context;
use nix::fcntl::OFlag;
use nix::sys::signal::kill;
use nix::unistd::pipe2;
use std::os::fd::{AsRawFd, OwnedFd};

/// What a launch left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Launched {
    /// One entry per stage, in stage order. `None` when the reaper
    /// collected that child before we could.
    Foreground(Vec<Option<Status>>),
    Background(Job),
}

impl Launched {
    /// Status of the last stage, if it is known.
    pub fn last_status(&self) -> Option<Status> {
        match self {
            Self::Foreground(statuses) => statuses.last().copied().flatten(),
            Self::Background(_) => None,
        }
    }
}

/// Run a pipeline: wait for every stage in the foreground, or register a job
/// led by the last stage and return at once.
pub fn launch(pipeline: Pipeline, jobs: &JobRegistry) -> anyhow::Result<Launched> {
    if pipeline.is_empty() {
        return Ok(Launched::Foreground(Vec::new()));
    }

    let text = pipeline.to_string();
    let programs = pipeline
        .stages
        .iter()
        .map(Program::new)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let bg = pipeline.bg;
    drop(pipeline);

    if bg {
        // Hold the table from the first fork until the job exists, so a
        // quick exit cannot be reaped before it is registered.
        let job = jobs.with(|table| {
            let pids = spawn(&programs, true)?;
            let (pgid, pid) = match (pids.first(), pids.last()) {
                (Some(&first), Some(&last)) => (first, last),
                _ => anyhow::bail!("Nothing was spawned."),
            };
            let id = table.add(pid, pgid, text);
            table.get(id).cloned().context("The new job is missing.")
        })?;
        tracing::info!(id = %job.id, pid = %job.pid, "started background job");
        Ok(Launched::Background(job))
    } else {
        let pids = spawn(&programs, false)?;
        let statuses = wait_all(&pids)?;
        tracing::debug!(?statuses, "foreground pipeline finished");
        Ok(Launched::Foreground(statuses))
    }
}

/// Fork one child per program, each stage's stdout piped into the next
/// stage's stdin. Returns the pids in stage order without waiting.
///
/// With `group` set every stage joins a new process group led by the first
/// one. If a pipe or fork fails, the stages already running are killed and
/// collected before the error is returned.
pub fn spawn(programs: &[Program], group: bool) -> anyhow::Result<Vec<Pid>> {
    let mut pids = Vec::with_capacity(programs.len());
    match spawn_into(programs, group, &mut pids) {
        Ok(()) => Ok(pids),
        Err(e) => {
            abandon(&pids);
            Err(e)
        }
    }
}

fn spawn_into(programs: &[Program], group: bool, pids: &mut Vec<Pid>) -> anyhow::Result<()> {
    let last = programs.len().saturating_sub(1);
    let mut in_fd: Option<OwnedFd> = None;

    for (i, program) in programs.iter().enumerate() {
        let pipe = if i < last {
            Some(pipe2(OFlag::O_CLOEXEC).map_err(Error::Pipe)?)
        } else {
            None
        };

        let wiring = Wiring {
            stdin: in_fd.as_ref().map(|fd| fd.as_raw_fd()),
            stdout: pipe.as_ref().map(|(_, write)| write.as_raw_fd()),
            spare: pipe.as_ref().map(|(read, _)| read.as_raw_fd()),
            pgid: if group {
                Some(pids.first().copied().unwrap_or(Pid::from_raw(0)))
            } else {
                None
            },
        };
        pids.push(program.spawn(&wiring)?);

        // The child has its own copies: close the previous read end and this
        // write end here, keep this read end for the next stage.
        drop(in_fd.take());
        in_fd = pipe.map(|(read, write)| {
            drop(write);
            read
        });
    }

    Ok(())
}

/// Wait for every pid, in order.
pub fn wait_all(pids: &[Pid]) -> anyhow::Result<Vec<Option<Status>>> {
    pids.iter().map(|&pid| job::wait(pid)).collect()
}

fn abandon(pids: &[Pid]) {
    for &pid in pids {
        if let Err(e) = kill(pid, Signal::SIGKILL) {
            tracing::warn!(%pid, "failed to kill a partial pipeline stage: {}", e);
        }
        let _ = job::wait(pid);
    }
}
