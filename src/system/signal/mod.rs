//! Utilities to handle signals.
mod handler;
mod info;
mod set;
mod stream;

pub(crate) use handler::{SignalHandler, SignalHandlerBehavior};
pub(crate) use set::SignalSet;
pub(crate) use stream::{register_handlers, SignalStream};

pub(crate) type SignalNumber = libc::c_int;

pub(crate) mod consts {
    pub(crate) use signal_hook::consts::signal::{
        SIGCHLD, SIGCONT, SIGINT, SIGKILL, SIGQUIT, SIGSTOP, SIGTSTP,
    };
}

/// The conventional name of a signal, like `SIGINT`, if it is known.
pub(crate) fn signal_name(signal: SignalNumber) -> Option<&'static str> {
    signal_hook::low_level::signal_name(signal)
}
