use std::io::Write;

use crate::{
    common::Error,
    exec::JobHost,
    jobs::{JobId, JobState, JobTable, TableError},
    log::{dev_info, dev_warn, user_info},
    relay,
    system::interface::ProcessId,
};

use super::{builtin::Builtin, parser::parse_line};

/// What the read-eval loop should do after a line has been evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// The state of a running shell: its jobs, how it reaches the system and where it reports to.
pub(crate) struct Shell<H, W> {
    pub(super) jobs: JobTable,
    pub(super) host: H,
    pub(super) out: W,
}

impl<H: JobHost, W: Write> Shell<H, W> {
    pub(crate) fn new(host: H, out: W) -> Self {
        Self {
            jobs: JobTable::default(),
            host,
            out,
        }
    }

    /// Evaluate one command line.
    ///
    /// Builtins run right away. Anything else is launched as a job; a foreground job is waited for
    /// before this returns.
    pub(crate) fn eval(&mut self, line: &str) -> Result<Flow, Error> {
        let command = parse_line(line);
        let Some((name, args)) = command.argv.split_first() else {
            return Ok(Flow::Continue);
        };

        if let Some(builtin) = Builtin::from_name(name) {
            dev_info!("running builtin `{}`", builtin.name());
            return self.run_builtin(builtin, args);
        }

        let text = line.trim_end_matches(['\n', '\r']);
        self.launch(&command.argv, command.background, text)?;

        Ok(Flow::Continue)
    }

    fn launch(&mut self, argv: &[String], background: bool, text: &str) -> Result<(), Error> {
        let state = if background {
            JobState::Background
        } else {
            JobState::Foreground
        };

        // The child would inherit anything still buffered and print it a second time.
        if let Err(err) = self.out.flush() {
            dev_warn!("cannot flush output: {err}");
        }

        let jobs = &mut self.jobs;
        let mut registered: Result<JobId, TableError> = Err(TableError::TableFull);
        let pid = self
            .host
            .launch(argv, &mut |pid| {
                registered = jobs.register(pid, state, text);
            })
            .map_err(Error::syscall("fork"))?;

        let jid = match registered {
            Ok(jid) => jid,
            Err(err) => {
                // The process runs untracked, its exit is ignored when it is reaped.
                writeln_ignore_io_error!(self.out, "{err}");
                return Ok(());
            }
        };
        user_info!("Added job [{jid}] {pid} {text}");

        if background {
            writeln_ignore_io_error!(self.out, "[{jid}] ({pid}) {text}");
            Ok(())
        } else {
            self.wait_foreground(pid)
        }
    }

    /// Block until the job for `pid` is gone or no longer in the foreground.
    ///
    /// Relayed signals are handled while waiting, which is how the job's state changes.
    pub(crate) fn wait_foreground(&mut self, pid: ProcessId) -> Result<(), Error> {
        while self.jobs.foreground_pid() == Some(pid) {
            self.handle_next_signal()?;
        }

        Ok(())
    }

    /// Wait for one relayed signal and act on it.
    pub(crate) fn handle_next_signal(&mut self) -> Result<(), Error> {
        let signal = self
            .host
            .next_signal()
            .map_err(Error::syscall("recv"))?;

        relay::dispatch(&mut self.jobs, &mut self.host, &mut self.out, signal)
    }

    pub(crate) fn out(&mut self) -> &mut W {
        &mut self.out
    }
}
