use std::{ffi::c_int, io};

use crate::system::{interface::ProcessId, signal::SignalNumber, wait::WaitStatus};

/// A state change reported for one of the shell's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildEvent {
    Exited(c_int),
    Signaled(SignalNumber),
    Stopped(SignalNumber),
    Continued,
}

impl ChildEvent {
    pub(crate) fn from_status(status: &WaitStatus) -> Option<Self> {
        if let Some(exit_code) = status.exit_status() {
            Some(Self::Exited(exit_code))
        } else if let Some(signal) = status.term_signal() {
            Some(Self::Signaled(signal))
        } else if let Some(signal) = status.stop_signal() {
            Some(Self::Stopped(signal))
        } else if status.did_continue() {
            Some(Self::Continued)
        } else {
            None
        }
    }
}

/// Everything the shell needs from the operating system to run jobs.
pub(crate) trait JobHost {
    /// Start `argv` as a new job in its own process group.
    ///
    /// `register` is called with the PID of the new job before any state change of that job can
    /// be observed through [`JobHost::reap`] or [`JobHost::next_signal`].
    fn launch(
        &mut self,
        argv: &[String],
        register: &mut dyn FnMut(ProcessId),
    ) -> io::Result<ProcessId>;

    /// Send `signal` to a single process.
    fn kill(&mut self, pid: ProcessId, signal: SignalNumber) -> io::Result<()>;

    /// Send `signal` to every process of a group.
    fn killpg(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()>;

    /// Collect one pending state change of any child without blocking.
    ///
    /// Returns `None` once there is nothing left to collect.
    fn reap(&mut self) -> io::Result<Option<(ProcessId, ChildEvent)>>;

    /// Block until the next relayed signal arrives.
    fn next_signal(&mut self) -> io::Result<SignalNumber>;
}
