//! The table of jobs the shell is tracking.
//!
//! The table is the single source of truth for what is running, in which process, and in which
//! state. It is only ever touched from the shell's control thread: the signal handlers do not
//! mutate it, they stream a notification that the control loop turns into a table update.
#![forbid(unsafe_code)]

use std::fmt;

use crate::system::interface::ProcessId;

/// Number of jobs the shell tracks at once.
pub(crate) const MAX_JOBS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct JobId(u32);

impl JobId {
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    pub(crate) const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    /// The word used for this state by the `jobs` listing.
    pub(crate) const fn describe(&self) -> &'static str {
        match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Job {
    pub(crate) pid: ProcessId,
    pub(crate) jid: JobId,
    pub(crate) state: JobState,
    pub(crate) command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableError {
    /// The PID cannot name a live process.
    InvalidPid(ProcessId),
    /// Every slot is taken.
    TableFull,
    /// Another job already owns the foreground.
    ForegroundTaken(JobId),
    NoSuchJob(ProcessId),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::InvalidPid(pid) => write!(f, "({pid}): invalid process id"),
            TableError::TableFull => f.write_str("Tried to create too many jobs"),
            TableError::ForegroundTaken(jid) => {
                write!(f, "job [{jid}] is already running in the foreground")
            }
            TableError::NoSuchJob(pid) => write!(f, "({pid}): No such job"),
        }
    }
}

/// A fixed-capacity registry of jobs, ordered by slot.
///
/// Invariants:
/// - at most one job is in the [`JobState::Foreground`] state;
/// - PIDs and job IDs are unique among the jobs in the table.
#[derive(Debug)]
pub(crate) struct JobTable {
    slots: Vec<Option<Job>>,
    next_jid: u32,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::with_capacity(MAX_JOBS)
    }
}

impl JobTable {
    /// Create an empty table with room for `capacity` jobs.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "a job table needs at least one slot");

        Self {
            slots: vec![None; capacity],
            next_jid: 1,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.slots.iter_mut().flatten()
    }

    fn max_jid(&self) -> u32 {
        self.jobs().map(|job| job.jid.get()).max().unwrap_or(0)
    }

    /// Advance the identifier counter, starting over at 1 once it grows past the capacity.
    fn advance_jid(&mut self) {
        self.next_jid += 1;
        if self.next_jid as usize > self.capacity() {
            self.next_jid = 1;
        }
    }

    /// Pick the identifier for a new job. The counter is skipped past identifiers that are still
    /// in use so a wrapped counter can never hand out a live job's identifier.
    fn take_jid(&mut self) -> JobId {
        if self.next_jid as usize > self.capacity() {
            self.next_jid = 1;
        }

        while self.find_by_jid(JobId::new(self.next_jid)).is_some() {
            self.advance_jid();
        }

        let jid = JobId::new(self.next_jid);
        self.advance_jid();
        jid
    }

    fn foreground(&self) -> Option<&Job> {
        self.jobs().find(|job| job.state == JobState::Foreground)
    }

    /// Add a job for `pid` in the first free slot and return its job ID.
    pub(crate) fn register(
        &mut self,
        pid: ProcessId,
        state: JobState,
        command: impl Into<String>,
    ) -> Result<JobId, TableError> {
        if !pid.is_valid() {
            return Err(TableError::InvalidPid(pid));
        }

        if state == JobState::Foreground {
            if let Some(job) = self.foreground() {
                return Err(TableError::ForegroundTaken(job.jid));
            }
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            return Err(TableError::TableFull);
        };

        let jid = self.take_jid();
        self.slots[index] = Some(Job {
            pid,
            jid,
            state,
            command: command.into(),
        });

        Ok(jid)
    }

    /// Remove the job for `pid`, returning it if it was in the table.
    ///
    /// Removing an absent job is not an error: a job killed by the `kill` builtin is removed
    /// again when its exit is reaped.
    pub(crate) fn remove(&mut self, pid: ProcessId) -> Option<Job> {
        if !pid.is_valid() {
            return None;
        }

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|job| job.pid == pid))?;
        let job = slot.take();

        self.next_jid = self.max_jid() + 1;

        job
    }

    pub(crate) fn find_by_pid(&self, pid: ProcessId) -> Option<&Job> {
        if !pid.is_valid() {
            return None;
        }

        self.jobs().find(|job| job.pid == pid)
    }

    pub(crate) fn find_by_jid(&self, jid: JobId) -> Option<&Job> {
        if jid.get() == 0 {
            return None;
        }

        self.jobs().find(|job| job.jid == jid)
    }

    /// Move the job for `pid` to `state`.
    pub(crate) fn set_state(&mut self, pid: ProcessId, state: JobState) -> Result<(), TableError> {
        if state == JobState::Foreground {
            if let Some(job) = self.foreground().filter(|job| job.pid != pid) {
                return Err(TableError::ForegroundTaken(job.jid));
            }
        }

        let job = self
            .jobs_mut()
            .find(|job| pid.is_valid() && job.pid == pid)
            .ok_or(TableError::NoSuchJob(pid))?;
        job.state = state;

        Ok(())
    }

    /// The PID of the job in the foreground, if any.
    pub(crate) fn foreground_pid(&self) -> Option<ProcessId> {
        self.foreground().map(|job| job.pid)
    }

    /// A snapshot of the jobs in slot order.
    pub(crate) fn list(&self) -> Vec<Job> {
        self.jobs().cloned().collect()
    }
}
