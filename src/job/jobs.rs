use super::{Pid, Status};

use anyhow::Context;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A background pipeline, tracked by the pid of its last stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub pid: Pid,
    pub pgid: Pid,
    pub text: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {} {}", self.id, self.pid, self.text)
    }
}

/// The job table. Most recently added first; ids start at 1 and are never
/// reused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Jobs {
    list: Vec<Job>,
    last_id: usize,
}

impl Jobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Into<String>>(&mut self, pid: Pid, pgid: Pid, text: T) -> JobId {
        // One job per leader pid.
        self.remove(pid);

        self.last_id += 1;
        let id = JobId(self.last_id);
        self.list.insert(
            0,
            Job {
                id,
                pid,
                pgid,
                text: text.into(),
            },
        );
        id
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Job> {
        let pos = self.list.iter().position(|job| job.pid == pid)?;
        Some(self.list.remove(pos))
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.list.iter().find(|job| job.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Handle to the job table shared by the interpreter and the reaper.
#[derive(Clone, Debug, Default)]
pub struct JobRegistry(Arc<Mutex<Jobs>>);

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the table locked.
    pub fn with<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Jobs) -> anyhow::Result<T>,
    {
        let mut lock = match self.0.lock() {
            Ok(l) => l,
            Err(e) => anyhow::bail!("Failed to get the lock: {}", e),
        };

        f(&mut lock)
    }

    pub fn add<T: Into<String>>(&self, pid: Pid, pgid: Pid, text: T) -> anyhow::Result<JobId> {
        self.with(|jobs| Ok(jobs.add(pid, pgid, text)))
    }

    /// Drop the job led by `pid`. Removing an unknown pid is a no-op.
    pub fn remove(&self, pid: Pid) -> anyhow::Result<Option<Job>> {
        self.with(|jobs| Ok(jobs.remove(pid)))
    }

    pub fn find(&self, id: JobId) -> anyhow::Result<Option<Job>> {
        self.with(|jobs| Ok(jobs.get(id).cloned()))
    }

    pub fn list(&self) -> anyhow::Result<Vec<Job>> {
        self.with(|jobs| Ok(jobs.iter().cloned().collect()))
    }

    /// Collect every terminated child without blocking and forget the jobs
    /// they led. Returns the jobs that finished.
    pub fn reap(&self) -> anyhow::Result<Vec<Job>> {
        let mut done = Vec::new();
        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    let pid = match status.pid() {
                        Some(pid) => pid,
                        None => continue,
                    };
                    tracing::debug!(%pid, status = ?Status::from_wait(status), "reaped child");
                    if let Some(job) = self.remove(pid)? {
                        tracing::info!(id = %job.id, %pid, "background job finished");
                        done.push(job);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e).context("Failed to reap children."),
            }
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn ids_increase_and_are_never_reused() {
        let mut jobs = Jobs::new();
        let a = jobs.add(pid(100), pid(100), "a");
        let b = jobs.add(pid(200), pid(200), "b");
        jobs.remove(pid(200));
        let c = jobs.add(pid(300), pid(300), "c");
        assert_eq!((a, b, c), (JobId(1), JobId(2), JobId(3)));
    }

    #[test]
    fn listing_is_newest_first() {
        let mut jobs = Jobs::new();
        jobs.add(pid(100), pid(100), "first");
        jobs.add(pid(200), pid(200), "second");
        let texts: Vec<_> = jobs.iter().map(|j| j.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut jobs = Jobs::new();
        jobs.add(pid(100), pid(100), "sleep 5");
        assert!(jobs.remove(pid(100)).is_some());
        assert!(jobs.remove(pid(100)).is_none());
        assert!(jobs.is_empty());
    }

    #[test]
    fn same_leader_replaces_entry() {
        let mut jobs = Jobs::new();
        jobs.add(pid(100), pid(100), "old");
        let id = jobs.add(pid(100), pid(100), "new");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs.get(id).map(|j| j.text.as_str()), Some("new"));
    }

    #[test]
    fn registry_lookups_do_not_mutate() {
        let registry = JobRegistry::new();
        let id = registry.add(pid(100), pid(90), "sleep 5").unwrap();
        let first = registry.list().unwrap();
        let second = registry.list().unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.find(id).unwrap().map(|j| j.pgid), Some(pid(90)));
        assert_eq!(registry.find(JobId(999)).unwrap(), None);
    }

    #[test]
    fn job_display_matches_listing_format() {
        let mut jobs = Jobs::new();
        jobs.add(pid(4242), pid(4240), "sleep 5 | cat");
        let line = jobs.iter().next().unwrap().to_string();
        assert_eq!(line, "[1] 4242 sleep 5 | cat");
    }
}
