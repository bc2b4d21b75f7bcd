use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(libc::pid_t);

impl ProcessId {
    pub const fn new(id: libc::pid_t) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> libc::pid_t {
        self.0
    }

    /// Whether this ID can name a live process. Zero and negative values are reserved by the
    /// kernel for process groups and "any child" wildcards.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
