mod builtin;
mod cli;
mod help;
mod parser;
mod shell;

use std::{
    fs::File,
    io::{self, Read, Write},
    os::fd::{AsFd, AsRawFd},
};

use crate::{
    common::Error,
    exec::{was_interrupted, EventRegistry, JobHost, Process, StopReason, SystemHost},
    log::{dev_info, dev_warn, ShellLogger},
    system::{dup2, getpgrp},
};

use self::{
    cli::{TshAction, TshOptions},
    help::{long_help_message, USAGE_MSG},
    shell::{Flow, Shell},
};

const PROMPT: &str = "tsh> ";

pub fn main() {
    let options = match TshOptions::from_env().map_err(Error::Options) {
        Ok(options) => options,
        Err(error) => {
            eprintln_ignore_io_error!("tsh: {error}\n{USAGE_MSG}");
            std::process::exit(1);
        }
    };

    if options.action == TshAction::Help {
        println_ignore_io_error!("{}", long_help_message());
        std::process::exit(1);
    }

    let user_level = if options.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    ShellLogger::new("").into_global_logger(user_level);

    match tsh_process(options) {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            if !error.is_silent() {
                eprintln_ignore_io_error!("tsh: {error}");
            }
            std::process::exit(1);
        }
    }
}

fn tsh_process(options: TshOptions) -> Result<(), Error> {
    // Whoever drives the shell through a pipe sees every message on one stream.
    dup2(io::stdout().as_raw_fd(), io::stderr().as_raw_fd()).map_err(Error::syscall("dup2"))?;

    let host = SystemHost::install().map_err(Error::syscall("sigaction"))?;
    dev_info!("shell running in process group {}", getpgrp());

    // Read straight from the descriptor: bytes buffered by `Stdin` would be invisible to `poll`.
    let input = File::from(io::stdin().as_fd().try_clone_to_owned()?);

    let mut registry: EventRegistry<ReadEvalLoop<SystemHost, io::Stdout, File>> =
        EventRegistry::new();
    registry.register_read_event(&host, ShellEvent::Signal);
    registry.register_read_event(&input, ShellEvent::Input);

    let mut read_eval = ReadEvalLoop {
        shell: Shell::new(host, io::stdout()),
        input,
        pending: Vec::new(),
        prompt: options.prompt,
    };

    read_eval.show_prompt();

    match registry.event_loop(&mut read_eval)? {
        StopReason::Break(error) => Err(error),
        StopReason::Exit(()) => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellEvent {
    Signal,
    Input,
}

/// Reads command lines and evaluates them, handling signals that arrive in between.
struct ReadEvalLoop<H, W, R> {
    shell: Shell<H, W>,
    input: R,
    pending: Vec<u8>,
    prompt: bool,
}

impl<H: JobHost, W: Write, R: Read> ReadEvalLoop<H, W, R> {
    fn show_prompt(&mut self) {
        if self.prompt {
            let out = self.shell.out();
            if let Err(err) = out.write_all(PROMPT.as_bytes()).and_then(|()| out.flush()) {
                dev_warn!("cannot show prompt: {err}");
            }
        }
    }

    /// Read what is available and evaluate every complete line.
    ///
    /// Returns [`Flow::Quit`] on end of input, after evaluating an unterminated last line.
    fn read_input(&mut self) -> Result<Flow, Error> {
        let mut buf = [0; 4096];
        let n = match self.input.read(&mut buf) {
            Ok(n) => n,
            Err(err) if was_interrupted(&err) => return Ok(Flow::Continue),
            Err(err) => return Err(Error::syscall("read")(err)),
        };

        if n == 0 {
            if !self.pending.is_empty() {
                let line = std::mem::take(&mut self.pending);
                self.shell.eval(&String::from_utf8_lossy(&line))?;
            }
            return Ok(Flow::Quit);
        }

        self.pending.extend_from_slice(&buf[..n]);

        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if self.shell.eval(&String::from_utf8_lossy(&line))? == Flow::Quit {
                return Ok(Flow::Quit);
            }
            self.show_prompt();
        }

        Ok(Flow::Continue)
    }
}

impl<H: JobHost, W: Write, R: Read> Process for ReadEvalLoop<H, W, R> {
    type Event = ShellEvent;
    type Break = Error;
    type Exit = ();

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        let result = match event {
            ShellEvent::Signal => self.shell.handle_next_signal().map(|()| Flow::Continue),
            ShellEvent::Input => self.read_input(),
        };

        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => registry.set_exit(()),
            Err(error) => registry.set_break(error),
        }
    }
}
