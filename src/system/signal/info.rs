use crate::system::interface::ProcessId;

use super::SignalNumber;

/// Information related to the arrival of a signal.
#[repr(transparent)]
pub(crate) struct SignalInfo {
    info: libc::siginfo_t,
}

impl SignalInfo {
    pub(super) const SIZE: usize = std::mem::size_of::<Self>();

    /// Returns whether the signal was sent by a process (`kill`, `killpg`, ...) rather than
    /// generated by the kernel, e.g. from a terminal keystroke or a child changing state.
    pub(crate) fn is_user_signaled(&self) -> bool {
        self.info.si_code <= 0
    }

    /// Gets the PID that sent the signal. Zero for kernel-generated signals.
    pub(crate) fn pid(&self) -> ProcessId {
        ProcessId::new(unsafe { self.info.si_pid() })
    }

    /// Gets the signal number.
    pub(crate) fn signal(&self) -> SignalNumber {
        self.info.si_signo
    }
}
