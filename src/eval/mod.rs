mod command;

pub use command::{launch, spawn, wait_all, Builtin, BuiltinKind, Command, Launched};

use crate::job::{JobRegistry, Status};
use crate::parse::{parse_line, Limits};

use std::io::Write;

/// What the read loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Interpreter state handed to every line: the job table and parser caps.
#[derive(Debug, Clone)]
pub struct Shell {
    jobs: JobRegistry,
    limits: Limits,
    status: i32,
}

impl Shell {
    pub fn new(jobs: JobRegistry, limits: Limits) -> Self {
        Self {
            jobs,
            limits,
            status: 0,
        }
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Exit code of the last line: the last foreground stage's status, 0 for
    /// a background launch or a builtin, 1 after an error.
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Parse one line and run it.
    pub fn eval<W: Write + ?Sized>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let res = self.eval_(line, out);
        self.status = match &res {
            Ok((_, status)) => status.map_or(0, |s| s.code()),
            Err(_) => 1,
        };
        res.map(|(flow, _)| flow)
    }

    fn eval_<W: Write + ?Sized>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<(Flow, Option<Status>)> {
        let pipeline = parse_line(line, self.limits)?;
        if pipeline.is_empty() {
            return Ok((Flow::Continue, None));
        }

        match Command::from(pipeline) {
            Command::Builtin(builtin) => Ok((builtin.eval(&self.jobs, out)?, None)),
            Command::External(pipeline) => match launch(pipeline, &self.jobs)? {
                Launched::Background(job) => {
                    writeln!(out, "[{}] {}", job.id, job.pid)?;
                    Ok((Flow::Continue, None))
                }
                launched => Ok((Flow::Continue, launched.last_status())),
            },
        }
    }
}
