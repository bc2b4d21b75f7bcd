use std::io::Write;

use crate::{
    common::Error,
    exec::JobHost,
    jobs::{Job, JobId, JobState},
    log::{user_info, user_warn},
    system::signal::consts::*,
};

use super::shell::{Flow, Shell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Quit,
    Jobs,
    Bg,
    Fg,
    Kill,
    Export,
}

impl Builtin {
    const ALL: &'static [Builtin] = &[
        Builtin::Quit,
        Builtin::Jobs,
        Builtin::Bg,
        Builtin::Fg,
        Builtin::Kill,
        Builtin::Export,
    ];

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Builtin::Quit => "quit",
            Builtin::Jobs => "jobs",
            Builtin::Bg => "bg",
            Builtin::Fg => "fg",
            Builtin::Kill => "kill",
            Builtin::Export => "export",
        }
    }
}

/// How a job selector argument was understood.
#[derive(Debug, PartialEq, Eq)]
enum Selector {
    Missing,
    Malformed,
    Pid(u32),
    Job(JobId),
}

impl Selector {
    fn parse(arg: Option<&str>) -> Self {
        let Some(arg) = arg else {
            return Selector::Missing;
        };

        let (is_job, digits) = match arg.strip_prefix('%') {
            Some(digits) => (true, digits),
            None => (false, arg),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Selector::Malformed;
        }

        match digits.parse::<u32>() {
            Ok(0) | Err(_) => Selector::Malformed,
            Ok(id) if is_job => Selector::Job(JobId::new(id)),
            Ok(id) => Selector::Pid(id),
        }
    }
}

impl<H: JobHost, W: Write> Shell<H, W> {
    pub(super) fn run_builtin(&mut self, builtin: Builtin, args: &[String]) -> Result<Flow, Error> {
        match builtin {
            Builtin::Quit => return Ok(Flow::Quit),
            Builtin::Jobs => self.list_jobs(),
            Builtin::Bg => self.resume_in_background(args),
            Builtin::Fg => self.resume_in_foreground(args)?,
            Builtin::Kill => self.kill_job(args),
            Builtin::Export => self.export(args),
        }

        Ok(Flow::Continue)
    }

    /// Resolve the job named by the first argument, explaining to the user why there is none.
    fn select_job(&mut self, builtin: Builtin, args: &[String]) -> Option<Job> {
        let name = builtin.name();
        let arg = args.first().map(String::as_str);

        match Selector::parse(arg) {
            Selector::Missing => {
                writeln_ignore_io_error!(self.out, "{name} command requires PID or %jobid argument");
                None
            }
            Selector::Malformed => {
                writeln_ignore_io_error!(self.out, "{name}: argument must be a PID or %jobid");
                None
            }
            // jobs can only be selected by their job ID
            Selector::Pid(pid) => {
                writeln_ignore_io_error!(self.out, "({pid}): No such process");
                None
            }
            Selector::Job(jid) => {
                let job = self.jobs.find_by_jid(jid).cloned();
                if job.is_none() {
                    writeln_ignore_io_error!(self.out, "%{jid}: No such job");
                }
                job
            }
        }
    }

    fn list_jobs(&mut self) {
        for job in self.jobs.list() {
            writeln_ignore_io_error!(
                self.out,
                "[{}] ({}) {} {}",
                job.jid,
                job.pid,
                job.state.describe(),
                job.command
            );
        }
    }

    fn resume_in_background(&mut self, args: &[String]) {
        let Some(job) = self.select_job(Builtin::Bg, args) else {
            return;
        };

        if let Err(err) = self.host.kill(job.pid, SIGCONT) {
            user_warn!("cannot continue job [{}] ({}): {err}", job.jid, job.pid);
            return;
        }

        if let Err(err) = self.jobs.set_state(job.pid, JobState::Background) {
            user_warn!("{err}");
            return;
        }

        writeln_ignore_io_error!(self.out, "[{}] ({}) {}", job.jid, job.pid, job.command);
    }

    fn resume_in_foreground(&mut self, args: &[String]) -> Result<(), Error> {
        let Some(job) = self.select_job(Builtin::Fg, args) else {
            return Ok(());
        };

        if let Err(err) = self.host.killpg(job.pid, SIGCONT) {
            user_warn!("cannot continue job [{}] ({}): {err}", job.jid, job.pid);
            return Ok(());
        }

        if let Err(err) = self.jobs.set_state(job.pid, JobState::Foreground) {
            user_warn!("{err}");
            return Ok(());
        }

        self.wait_foreground(job.pid)
    }

    fn kill_job(&mut self, args: &[String]) {
        let Some(job) = self.select_job(Builtin::Kill, args) else {
            return;
        };

        if let Err(err) = self.host.kill(job.pid, SIGKILL) {
            user_warn!("cannot kill job [{}] ({}): {err}", job.jid, job.pid);
            return;
        }

        // The exit is still reaped later, by then the job is gone and nothing is reported.
        self.jobs.remove(job.pid);
        user_info!("Job [{}] ({}) killed", job.jid, job.pid);
    }

    fn export(&mut self, args: &[String]) {
        let assignment = args
            .first()
            .and_then(|arg| arg.split_once('='))
            .filter(|(name, value)| {
                !name.is_empty() && !name.contains('\0') && !value.contains('\0')
            });

        match assignment {
            Some((name, value)) => std::env::set_var(name, value),
            None => writeln_ignore_io_error!(self.out, "export: usage: export NAME=VALUE"),
        }
    }
}
