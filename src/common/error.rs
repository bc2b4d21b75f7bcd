use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    /// Terminate without printing anything; whatever needed saying was already said.
    Silent,
    Options(String),
    /// A system call the shell cannot do without failed. The first field names the call.
    Io(Option<&'static str>, io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Silent => Ok(()),
            Error::Options(e) => write!(f, "{e}"),
            Error::Io(location, e) => {
                if let Some(call) = location {
                    write!(f, "{call} error: {e}")
                } else {
                    write!(f, "IO error: {e}")
                }
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(None, err)
    }
}

impl Error {
    /// Wrap the failure of the system call named `call`.
    pub fn syscall(call: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |err| Error::Io(Some(call), err)
    }

    /// Returns `true` if the error is [`Silent`].
    ///
    /// [`Silent`]: Error::Silent
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }
}
