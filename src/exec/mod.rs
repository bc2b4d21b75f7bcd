mod event;
mod interface;
mod io_util;
#[cfg(test)]
pub(crate) mod scripted;

use std::{
    borrow::Cow,
    io,
    os::{
        fd::{AsRawFd, RawFd},
        unix::process::CommandExt,
    },
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    log::{dev_info, dev_warn},
    system::{
        _exit, fork,
        interface::ProcessId,
        kill, killpg, setpgid,
        signal::{
            consts::*, register_handlers, signal_name, SignalHandler, SignalHandlerBehavior,
            SignalNumber, SignalSet, SignalStream,
        },
        wait::{Wait, WaitError, WaitOptions, ANY_CHILD},
        ForkResult,
    },
};

pub(crate) use event::{EventRegistry, Process, StopReason};
pub(crate) use interface::{ChildEvent, JobHost};
pub(crate) use io_util::was_interrupted;

use self::io_util::retry_while_interrupted;

/// Signals that are relayed to the control loop through the [`SignalStream`].
pub(crate) const RELAYED_SIGNALS: [SignalNumber; 4] = [SIGCHLD, SIGINT, SIGTSTP, SIGQUIT];

/// Signals held back from the time a job is forked until it is in the job table.
const LAUNCH_MASK: [SignalNumber; 3] = [SIGCHLD, SIGINT, SIGTSTP];

/// The [`JobHost`] backed by the real operating system.
///
/// Holding a value of this type keeps the relayed signals routed into the signal stream. Dropping
/// it restores their previous actions.
pub(crate) struct SystemHost {
    signal_stream: &'static SignalStream,
    _signal_handlers: [SignalHandler; RELAYED_SIGNALS.len()],
}

impl SystemHost {
    /// Route the relayed signals into the signal stream.
    ///
    /// # Panics
    ///
    /// If this function has been called before.
    pub(crate) fn install() -> io::Result<Self> {
        let signal_stream = SignalStream::init()?;
        let signal_handlers = register_handlers(RELAYED_SIGNALS)?;

        // A mask inherited from our parent would keep the notifications from ever arriving.
        let inherited = SignalSet::with(&RELAYED_SIGNALS)?.unblock()?;
        for signal in RELAYED_SIGNALS {
            if inherited.contains(signal) {
                dev_info!("unblocked inherited mask for {}", signal_fmt(signal));
            }
        }

        Ok(Self {
            signal_stream,
            _signal_handlers: signal_handlers,
        })
    }
}

impl AsRawFd for SystemHost {
    fn as_raw_fd(&self) -> RawFd {
        self.signal_stream.as_raw_fd()
    }
}

impl JobHost for SystemHost {
    fn launch(
        &mut self,
        argv: &[String],
        register: &mut dyn FnMut(ProcessId),
    ) -> io::Result<ProcessId> {
        let Some((program, arguments)) = argv.split_first() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot launch an empty command",
            ));
        };

        let mut command = Command::new(program_path(program));
        command.arg0(program).args(arguments);

        let original_set = SignalSet::with(&LAUNCH_MASK)?.block()?;

        let pid = match fork() {
            Ok(ForkResult::Parent(pid)) => pid,
            Ok(ForkResult::Child) => exec_job(command, program, &original_set),
            Err(err) => {
                if let Err(err) = original_set.set_mask() {
                    dev_warn!("cannot restore signal mask: {err}");
                }
                return Err(err);
            }
        };

        // The child does the same thing, whoever runs first creates the group. This fails with
        // `EACCES` once the child has called `exec`, which is fine.
        if let Err(err) = setpgid(pid, pid) {
            dev_info!("cannot set process group of {pid}: {err}");
        }

        register(pid);
        dev_info!("launched {pid} for `{program}`");

        original_set.set_mask()?;

        Ok(pid)
    }

    fn kill(&mut self, pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        dev_info!("sending {} to {pid}", signal_fmt(signal));
        kill(pid, signal)
    }

    fn killpg(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        dev_info!("sending {} to group {pgid}", signal_fmt(signal));
        killpg(pgid, signal)
    }

    fn reap(&mut self) -> io::Result<Option<(ProcessId, ChildEvent)>> {
        reap_any_child()
    }

    fn next_signal(&mut self) -> io::Result<SignalNumber> {
        let info = retry_while_interrupted(|| self.signal_stream.recv())?;

        dev_info!(
            "received{} {} from {}",
            cond_fmt(info.is_user_signaled(), " user signaled", ""),
            signal_fmt(info.signal()),
            info.pid()
        );

        Ok(info.signal())
    }
}

/// Collect one pending state change of any child without blocking.
fn reap_any_child() -> io::Result<Option<(ProcessId, ChildEvent)>> {
    loop {
        match ANY_CHILD.wait(WaitOptions::new().no_hang().untraced()) {
            Ok((pid, status)) => match ChildEvent::from_status(&status) {
                Some(event) => {
                    dev_info!("{pid} changed state: {status:?}");
                    return Ok(Some((pid, event)));
                }
                None => dev_warn!("unexpected wait status for {pid}: {status:?}"),
            },
            Err(WaitError::NotReady) => return Ok(None),
            Err(WaitError::Io(err)) if was_interrupted(&err) => {}
            // Notifications coalesce, so there may be nobody left to collect.
            Err(WaitError::Io(err)) if err.raw_os_error() == Some(libc::ECHILD) => return Ok(None),
            Err(WaitError::Io(err)) => return Err(err),
        }
    }
}

/// The path that gets executed for `program`.
///
/// Names are never looked up in `PATH`: a bare name refers to a file in the current directory.
fn program_path(program: &str) -> PathBuf {
    if program.contains('/') {
        PathBuf::from(program)
    } else {
        Path::new(".").join(program)
    }
}

fn exec_job(mut command: Command, program: &str, original_set: &SignalSet) -> ! {
    for signal in RELAYED_SIGNALS {
        match SignalHandler::register(signal, SignalHandlerBehavior::Default) {
            Ok(handler) => handler.forget(),
            Err(err) => dev_warn!("cannot reset action for {}: {err}", signal_fmt(signal)),
        }
    }

    let this = ProcessId::new(0);
    if let Err(err) = setpgid(this, this) {
        dev_warn!("cannot create process group: {err}");
    }

    if let Err(err) = original_set.set_mask() {
        dev_warn!("cannot restore signal mask: {err}");
    }

    let err = command.exec();
    dev_info!("cannot execute `{program}`: {err}");
    println_ignore_io_error!("{program}: Command not found");

    _exit(1)
}

fn signal_fmt(signal: SignalNumber) -> Cow<'static, str> {
    signal_name(signal)
        .map(|name| name.into())
        .unwrap_or_else(|| format!("unknown signal #{}", signal).into())
}

const fn cond_fmt<'a>(cond: bool, true_s: &'a str, false_s: &'a str) -> &'a str {
    if cond {
        true_s
    } else {
        false_s
    }
}
