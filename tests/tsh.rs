//! End-to-end scenarios that drive the `tsh` binary through its standard streams.

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    process::{Command, Output, Stdio},
};

use pretty_assertions::assert_eq;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn tsh() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tsh"))
}

/// Run the shell without a prompt, feed it `input` and collect everything it prints.
fn run(input: &str) -> Result<Output> {
    run_with(&["-p"], input)
}

fn run_with(args: &[&str], input: &str) -> Result<Output> {
    let mut child = tsh()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    child
        .stdin
        .take()
        .ok_or("stdin is piped")?
        .write_all(input.as_bytes())?;

    Ok(child.wait_with_output()?)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// The PID between the parentheses of a `[jid] (pid) ...` line.
fn pid_of(line: &str) -> Result<i32> {
    let start = line.find('(').ok_or("no pid")? + 1;
    let end = line.find(')').ok_or("no pid")?;
    Ok(line[start..end].parse()?)
}

#[test]
fn runs_foreground_commands() -> Result<()> {
    let output = run("/bin/echo hello 'big  world'\n/bin/echo done\n")?;

    assert_eq!(Some(0), output.status.code());
    assert_eq!("hello big  world\ndone\n", stdout(&output));

    Ok(())
}

#[test]
fn prompts_unless_told_not_to() -> Result<()> {
    let output = run_with(&[], "/bin/echo hi\n")?;

    assert_eq!("tsh> hi\ntsh> ", stdout(&output));

    Ok(())
}

#[test]
fn evaluates_an_unterminated_last_line() -> Result<()> {
    let output = run("/bin/echo last")?;

    assert_eq!("last\n", stdout(&output));

    Ok(())
}

#[test]
fn announces_and_lists_background_jobs() -> Result<()> {
    let output = run("/bin/sleep 1 &\njobs\n")?;
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(2, lines.len(), "{text}");
    let pid = pid_of(lines[0])?;
    assert_eq!(format!("[1] ({pid}) /bin/sleep 1 &"), lines[0]);
    assert_eq!(format!("[1] ({pid}) Running /bin/sleep 1 &"), lines[1]);

    Ok(())
}

#[test]
fn missing_commands_are_reported_by_the_child() -> Result<()> {
    let output = run("./definitely-not-a-command\nnot-here-either arg\n/bin/echo still alive\n")?;

    assert_eq!(Some(0), output.status.code());
    assert_eq!(
        "./definitely-not-a-command: Command not found\n\
         not-here-either: Command not found\n\
         still alive\n",
        stdout(&output)
    );

    Ok(())
}

#[test]
fn names_are_not_looked_up_in_path() -> Result<()> {
    let output = run("echo hello\n")?;

    assert_eq!("echo: Command not found\n", stdout(&output));

    Ok(())
}

#[test]
fn builtin_argument_errors() -> Result<()> {
    let output = run("bg\nfg abc\nbg 42\nfg %3\n")?;

    assert_eq!(
        "bg command requires PID or %jobid argument\n\
         fg: argument must be a PID or %jobid\n\
         (42): No such process\n\
         %3: No such job\n",
        stdout(&output)
    );

    Ok(())
}

#[test]
fn quit_ignores_the_rest_of_the_input() -> Result<()> {
    let output = run("quit\n/bin/echo never\n")?;

    assert_eq!(Some(0), output.status.code());
    assert_eq!("", stdout(&output));

    Ok(())
}

#[test]
fn export_reaches_later_jobs() -> Result<()> {
    let output = run("export TSH_GREETING=hello\n/bin/sh -c 'echo $TSH_GREETING'\n/bin/echo $TSH_GREETING\n")?;

    assert_eq!("hello\nhello\n", stdout(&output));

    Ok(())
}

#[test]
fn stopped_job_can_be_listed_and_killed() -> Result<()> {
    let output = run("/bin/sh -c 'kill -STOP $$'\njobs\nkill %1\njobs\n")?;
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(2, lines.len(), "{text}");
    let pid = pid_of(lines[0])?;
    assert_eq!(
        format!("Job [1] ({pid}) stopped by signal {}", libc::SIGSTOP),
        lines[0]
    );
    assert_eq!(
        format!("[1] ({pid}) Stopped /bin/sh -c 'kill -STOP $$'"),
        lines[1]
    );

    Ok(())
}

#[test]
fn stopped_job_resumes_in_the_background() -> Result<()> {
    let output = run("/bin/sh -c 'kill -STOP $$; sleep 1'\nbg %1\njobs\n")?;
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(3, lines.len(), "{text}");
    let pid = pid_of(lines[0])?;
    assert_eq!(
        format!("[1] ({pid}) /bin/sh -c 'kill -STOP $$; sleep 1'"),
        lines[1]
    );
    assert_eq!(
        format!("[1] ({pid}) Running /bin/sh -c 'kill -STOP $$; sleep 1'"),
        lines[2]
    );

    Ok(())
}

#[test]
fn interrupted_job_is_reported() -> Result<()> {
    let output = run("/bin/sh -c 'kill -INT $$'\njobs\n")?;
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(1, lines.len(), "{text}");
    let pid = pid_of(lines[0])?;
    assert_eq!(
        format!("Job [1] ({pid}) terminated by signal {}", libc::SIGINT),
        lines[0]
    );

    Ok(())
}

#[test]
fn quit_signal_terminates_the_shell() -> Result<()> {
    let mut child = tsh()
        .arg("-p")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().ok_or("stdin is piped")?;
    let mut stdout = BufReader::new(child.stdout.take().ok_or("stdout is piped")?);

    // once the shell has run a command its handlers are in place
    stdin.write_all(b"/bin/echo ready\n")?;
    let mut line = String::new();
    stdout.read_line(&mut line)?;
    assert_eq!("ready\n", line);

    if unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGQUIT) } != 0 {
        return Err(io::Error::last_os_error().into());
    }

    let mut rest = String::new();
    stdout.read_to_string(&mut rest)?;
    let status = child.wait()?;
    drop(stdin);

    assert_eq!("Terminating after receipt of SIGQUIT signal\n", rest);
    assert_eq!(Some(1), status.code());

    Ok(())
}

#[test]
fn verbose_mode_traces_jobs() -> Result<()> {
    let output = run_with(&["-vp"], "/bin/sleep 1 &\n")?;
    let text = stdout(&output);

    // diagnostics share the standard output
    assert!(text.contains("Added job [1] "), "{text}");
    assert!(output.stderr.is_empty());

    Ok(())
}

#[test]
fn help_exits_with_failure() -> Result<()> {
    let output = tsh().arg("-h").output()?;

    assert_eq!(Some(1), output.status.code());
    assert!(stdout(&output).starts_with("Usage: tsh [-hvp]\n"));

    Ok(())
}

#[test]
fn unknown_flags_are_rejected() -> Result<()> {
    let output = tsh().arg("-x").stdin(Stdio::null()).output()?;

    assert_eq!(Some(1), output.status.code());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid option -- 'x'"));

    Ok(())
}
