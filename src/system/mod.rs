use std::{io, os::fd::RawFd};

use crate::cutils::cerr;
use interface::ProcessId;

use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod poll;

pub mod signal;

pub mod wait;

pub(crate) fn _exit(status: libc::c_int) -> ! {
    unsafe { libc::_exit(status) }
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

unsafe fn inner_fork() -> io::Result<ForkResult> {
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

#[cfg(target_os = "linux")]
/// Create a new process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: `fork` is implemented using `clone` in linux so we don't need to worry about signal
    // safety.
    unsafe { inner_fork() }
}

#[cfg(not(target_os = "linux"))]
/// Create a new process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: the shell never spawns threads, so the child is free to run any code until it
    // calls `execve` or `_exit`.
    unsafe { inner_fork() }
}

/// Send a signal to a process with the specified ID.
pub fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// Send a signal to a process group with the specified ID.
pub fn killpg(pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pgid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::killpg(pgid.get(), signal) }).map(|_| ())
}

/// Get the process group ID of the current process.
pub fn getpgrp() -> ProcessId {
    ProcessId::new(unsafe { libc::getpgrp() })
}

/// Set a process group ID.
///
/// Passing a zero `pid` targets the calling process and a zero `pgid` uses the target's own PID
/// as the group ID.
pub fn setpgid(pid: ProcessId, pgid: ProcessId) -> io::Result<()> {
    cerr(unsafe { libc::setpgid(pid.get(), pgid.get()) }).map(|_| ())
}

/// Make `new_fd` refer to the same open file description as `old_fd`.
pub fn dup2(old_fd: RawFd, new_fd: RawFd) -> io::Result<()> {
    cerr(unsafe { libc::dup2(old_fd, new_fd) }).map(|_| ())
}

pub(crate) fn make_zeroed_sigaction() -> libc::sigaction {
    // SAFETY: since sigaction is a C struct, all-zeroes is a valid representation. Its exact
    // layout differs between platforms, so it cannot be built with a struct literal.
    unsafe { std::mem::zeroed() }
}
