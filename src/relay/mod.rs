//! Acting on the signals relayed from the signal stream.
//!
//! Every handler here runs on the control thread, so it is free to update the job table and to
//! write to the shell's output.
use std::io::Write;

use crate::{
    common::Error,
    exec::{ChildEvent, JobHost},
    jobs::{JobState, JobTable},
    log::{dev_info, dev_warn, user_info},
    system::{
        interface::ProcessId,
        signal::{consts::*, signal_name, SignalNumber},
    },
};

/// Act on one relayed signal.
///
/// Returns [`Error::Silent`] after `SIGQUIT`, which ends the shell.
pub(crate) fn dispatch(
    jobs: &mut JobTable,
    host: &mut impl JobHost,
    out: &mut impl Write,
    signal: SignalNumber,
) -> Result<(), Error> {
    match signal {
        SIGCHLD => reap_children(jobs, host, out),
        SIGINT | SIGTSTP => {
            forward_to_foreground(jobs, host, signal);
            Ok(())
        }
        SIGQUIT => {
            writeln_ignore_io_error!(out, "Terminating after receipt of SIGQUIT signal");
            Err(Error::Silent)
        }
        _ => {
            dev_warn!("ignoring unexpected signal {signal}");
            Ok(())
        }
    }
}

/// Collect every pending child state change and apply it to the table.
pub(crate) fn reap_children(
    jobs: &mut JobTable,
    host: &mut impl JobHost,
    out: &mut impl Write,
) -> Result<(), Error> {
    while let Some((pid, event)) = host.reap().map_err(Error::syscall("waitpid"))? {
        on_child_event(jobs, out, pid, event);
    }

    Ok(())
}

fn on_child_event(jobs: &mut JobTable, out: &mut impl Write, pid: ProcessId, event: ChildEvent) {
    let Some(job) = jobs.find_by_pid(pid) else {
        dev_info!("{pid} is not a job, ignoring {event:?}");
        return;
    };
    let jid = job.jid;

    match event {
        ChildEvent::Exited(code) => {
            jobs.remove(pid);
            user_info!("Job [{jid}] ({pid}) exited with status {code}");
        }
        ChildEvent::Signaled(signal) => {
            if signal == SIGINT {
                writeln_ignore_io_error!(out, "Job [{jid}] ({pid}) terminated by signal {signal}");
            }
            jobs.remove(pid);
            user_info!(
                "Job [{jid}] ({pid}) killed by {}",
                signal_name(signal).unwrap_or("unknown signal")
            );
        }
        ChildEvent::Stopped(signal) => {
            // The job is known to be in the table, so this cannot fail.
            if let Err(err) = jobs.set_state(pid, JobState::Stopped) {
                dev_warn!("cannot mark {pid} as stopped: {err}");
            }
            writeln_ignore_io_error!(out, "Job [{jid}] ({pid}) stopped by signal {signal}");
        }
        ChildEvent::Continued => {}
    }
}

/// Send `signal` to the process group of the foreground job, if there is one.
pub(crate) fn forward_to_foreground(
    jobs: &JobTable,
    host: &mut impl JobHost,
    signal: SignalNumber,
) {
    let Some(pid) = jobs.foreground_pid() else {
        dev_info!("no foreground job to forward signal {signal} to");
        return;
    };

    // The group may be gone already, the pending SIGCHLD will tell.
    if let Err(err) = host.killpg(pid, signal) {
        dev_warn!("cannot forward signal {signal} to group {pid}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        common::Error,
        exec::{
            scripted::{ScriptedHost, Sent},
            ChildEvent,
        },
        jobs::{JobState, JobTable},
        system::{interface::ProcessId, signal::consts::*},
    };

    use super::{dispatch, forward_to_foreground, reap_children};

    fn output(buf: &[u8]) -> &str {
        std::str::from_utf8(buf).unwrap()
    }

    fn pid(n: i32) -> ProcessId {
        ProcessId::new(n)
    }

    #[test]
    fn exit_removes_the_job_silently() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Background, "sleep 1 &")
            .unwrap();
        host.push_reap(pid(100), ChildEvent::Exited(0));

        reap_children(&mut jobs, &mut host, &mut out).unwrap();

        assert!(jobs.find_by_pid(pid(100)).is_none());
        assert_eq!(output(&out), "");
    }

    #[test]
    fn interrupt_termination_is_reported() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Foreground, "sleep 5")
            .unwrap();
        jobs.register(pid(101), JobState::Background, "sleep 6 &")
            .unwrap();
        host.push_reap(pid(100), ChildEvent::Signaled(SIGINT))
            .push_reap(pid(101), ChildEvent::Signaled(SIGKILL));

        dispatch(&mut jobs, &mut host, &mut out, SIGCHLD).unwrap();

        assert!(jobs.list().is_empty());
        assert_eq!(
            output(&out),
            format!("Job [1] (100) terminated by signal {SIGINT}\n")
        );
    }

    #[test]
    fn failed_reap_is_fatal() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Background, "sleep 5 &")
            .unwrap();
        host.push_reap(pid(100), ChildEvent::Exited(0))
            .push_reap_error(libc::EINVAL);

        let err = dispatch(&mut jobs, &mut host, &mut out, SIGCHLD).unwrap_err();

        assert!(matches!(err, Error::Io(Some("waitpid"), _)));
        // events collected before the failure still apply
        assert!(jobs.find_by_pid(pid(100)).is_none());
    }

    #[test]
    fn stopped_job_stays_in_the_table() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Foreground, "sleep 5")
            .unwrap();
        host.push_reap(pid(100), ChildEvent::Stopped(SIGTSTP));

        dispatch(&mut jobs, &mut host, &mut out, SIGCHLD).unwrap();

        let job = jobs.find_by_pid(pid(100)).unwrap();
        assert_eq!(job.state, JobState::Stopped);
        assert_eq!(jobs.foreground_pid(), None);
        assert_eq!(
            output(&out),
            format!("Job [1] (100) stopped by signal {SIGTSTP}\n")
        );
    }

    #[test]
    fn unknown_children_and_continues_are_ignored() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Background, "sleep 5 &")
            .unwrap();
        host.push_reap(pid(555), ChildEvent::Exited(1))
            .push_reap(pid(100), ChildEvent::Continued);

        reap_children(&mut jobs, &mut host, &mut out).unwrap();

        assert_eq!(
            jobs.find_by_pid(pid(100)).map(|job| job.state),
            Some(JobState::Background)
        );
        assert_eq!(output(&out), "");
    }

    #[test]
    fn nothing_to_reap_is_fine() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        reap_children(&mut jobs, &mut host, &mut out).unwrap();
        assert!(jobs.list().is_empty());
    }

    #[test]
    fn keyboard_signals_reach_the_foreground_group() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        jobs.register(pid(100), JobState::Background, "sleep 5 &")
            .unwrap();
        jobs.register(pid(200), JobState::Foreground, "sleep 6")
            .unwrap();

        dispatch(&mut jobs, &mut host, &mut out, SIGINT).unwrap();
        dispatch(&mut jobs, &mut host, &mut out, SIGTSTP).unwrap();

        assert_eq!(
            host.sent,
            [Sent::Group(pid(200), SIGINT), Sent::Group(pid(200), SIGTSTP)]
        );
        // Forwarding alone never changes the table.
        assert_eq!(jobs.foreground_pid(), Some(pid(200)));
    }

    #[test]
    fn keyboard_signals_without_foreground_job_do_nothing() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();

        jobs.register(pid(100), JobState::Background, "sleep 5 &")
            .unwrap();

        forward_to_foreground(&jobs, &mut host, SIGINT);
        forward_to_foreground(&jobs, &mut host, SIGTSTP);

        assert!(host.sent.is_empty());
    }

    #[test]
    fn quit_signal_ends_the_shell() {
        let mut jobs = JobTable::default();
        let mut host = ScriptedHost::default();
        let mut out = Vec::new();

        let err = dispatch(&mut jobs, &mut host, &mut out, SIGQUIT).unwrap_err();

        assert!(matches!(err, Error::Silent));
        assert_eq!(
            output(&out),
            "Terminating after receipt of SIGQUIT signal\n"
        );
    }
}
