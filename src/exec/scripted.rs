use std::{collections::VecDeque, io};

use crate::system::{interface::ProcessId, signal::SignalNumber};

use super::{ChildEvent, JobHost};

/// A signal sent through a [`ScriptedHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sent {
    Process(ProcessId, SignalNumber),
    Group(ProcessId, SignalNumber),
}

/// A [`JobHost`] that never touches real processes.
///
/// Launched jobs get consecutive PIDs starting at [`ScriptedHost::FIRST_PID`]. Signals and child
/// state changes are replayed from queues filled by the test, an empty signal queue ends the
/// conversation with [`io::ErrorKind::UnexpectedEof`].
#[derive(Default)]
pub(crate) struct ScriptedHost {
    launches: u32,
    pub(crate) launched: Vec<Vec<String>>,
    pub(crate) sent: Vec<Sent>,
    signals: VecDeque<SignalNumber>,
    reaps: VecDeque<io::Result<(ProcessId, ChildEvent)>>,
}

impl ScriptedHost {
    pub(crate) const FIRST_PID: i32 = 1000;

    /// The PID the `n`-th launch (counting from zero) gets.
    pub(crate) fn pid(n: i32) -> ProcessId {
        ProcessId::new(Self::FIRST_PID + n)
    }

    pub(crate) fn push_signal(&mut self, signal: SignalNumber) -> &mut Self {
        self.signals.push_back(signal);
        self
    }

    pub(crate) fn push_reap(&mut self, pid: ProcessId, event: ChildEvent) -> &mut Self {
        self.reaps.push_back(Ok((pid, event)));
        self
    }

    /// Make the next reap fail with the OS error `errno`.
    pub(crate) fn push_reap_error(&mut self, errno: i32) -> &mut Self {
        self.reaps.push_back(Err(io::Error::from_raw_os_error(errno)));
        self
    }
}

impl JobHost for ScriptedHost {
    fn launch(
        &mut self,
        argv: &[String],
        register: &mut dyn FnMut(ProcessId),
    ) -> io::Result<ProcessId> {
        let pid = Self::pid(self.launches as i32);
        self.launches += 1;
        self.launched.push(argv.to_vec());
        register(pid);
        Ok(pid)
    }

    fn kill(&mut self, pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        self.sent.push(Sent::Process(pid, signal));
        Ok(())
    }

    fn killpg(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        self.sent.push(Sent::Group(pgid, signal));
        Ok(())
    }

    fn reap(&mut self) -> io::Result<Option<(ProcessId, ChildEvent)>> {
        self.reaps.pop_front().transpose()
    }

    fn next_signal(&mut self) -> io::Result<SignalNumber> {
        self.signals.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no more scripted signals")
        })
    }
}
