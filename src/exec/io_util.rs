use std::io;

/// Return `true` if the IO error is an interruption.
pub(crate) fn was_interrupted(err: &io::Error) -> bool {
    // `EINTR` and `EAGAIN` both mean the call can simply be retried.
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Call `f` repeatedly until it succeds or it encounters a non-interruption error.
pub(crate) fn retry_while_interrupted<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(err) if was_interrupted(&err) => {}
            result => return result,
        }
    }
}
