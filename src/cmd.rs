use colored::Colorize;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DRAIN_GRACE: Duration = Duration::from_millis(500);
/// Time between SIGTERM and SIGKILL when a command times out
const KILL_GRACE: Duration = Duration::from_millis(500);
const STDERR_TAIL_LINES: usize = 20;

/// Shell convention for "terminated by SIGINT"
const SIGINT_EXIT_CODE: i32 = 130;

/// How a single invocation is run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    /// Print the command line and pass output through to the terminal
    pub echo: bool,
    pub cwd: Option<PathBuf>,
}

impl RunOptions {
    /// Read-only queries: no output on the terminal
    pub fn quiet(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            echo: false,
            cwd: None,
        }
    }

    /// Installs and bootstrap steps: the user sees what runs
    pub fn echoed(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            echo: true,
            cwd: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Non-zero exit, or `None` when killed by a signal
    Failed(Option<i32>),
    TimedOut(Duration),
    /// The program could not be started at all
    NotStarted(String),
}

/// Result of one external process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    pub status: Status,
    /// Captured stdout; empty when the output was echoed to the terminal
    pub stdout: String,
    /// Trailing stderr lines, kept for diagnostics only
    pub stderr: String,
}

impl Exit {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Status::Failed(Some(code)),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// One-line description of how the command ended, with the last stderr line
    pub fn cause(&self, program: &str) -> String {
        let base = match &self.status {
            Status::Success => format!("{} succeeded", program),
            Status::Failed(Some(code)) => format!("{} exited with code {}", program, code),
            Status::Failed(None) => format!("{} was terminated by a signal", program),
            Status::TimedOut(limit) => {
                format!("{} timed out after {}s", program, limit.as_secs())
            }
            Status::NotStarted(reason) => format!("{} could not be started: {}", program, reason),
        };

        match self.stderr.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(last) => format!("{}: {}", base, last.trim()),
            None => base,
        }
    }
}

/// Executes external programs on behalf of the backends
pub trait Runner: Send + Sync {
    /// Run a program to completion.
    ///
    /// Failures to start, non-zero exits and timeouts are reported through
    /// [`Exit`]. The only error is [`Error::Interrupted`].
    fn run(&self, program: &str, args: &[String], opts: &RunOptions) -> Result<Exit>;
}

/// Runs real processes with `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[String], opts: &RunOptions) -> Result<Exit> {
        if opts.echo {
            println!("{}", format!("> {} {}", program, args.join(" ")).cyan());
        }
        tracing::debug!(program, ?args, "running command");

        let mut command = Command::new(program);
        command.args(args).stderr(Stdio::piped());
        if opts.echo {
            command.stdin(Stdio::inherit()).stdout(Stdio::inherit());
        } else {
            // Own process group so a timeout can take down the whole tree.
            // Echoed commands stay in the foreground group for sudo prompts and Ctrl-C.
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .process_group(0);
        }
        if let Some(dir) = &opts.cwd {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(Exit {
                    status: Status::NotStarted(e.to_string()),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        };

        let tail = Arc::new(Mutex::new(VecDeque::new()));
        let drain = child
            .stderr
            .take()
            .map(|stderr| spawn_drain(stderr, Arc::clone(&tail), opts.echo));
        let captured = Arc::new(Mutex::new(String::new()));
        let collect = child
            .stdout
            .take()
            .map(|stdout| spawn_collect(stdout, Arc::clone(&captured)));

        let started = Instant::now();
        let finished = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    break Err(Status::NotStarted(e.to_string()));
                }
            }

            if let Some(limit) = opts.timeout {
                if started.elapsed() >= limit {
                    tracing::warn!(program, secs = limit.as_secs(), "command timed out, killing");
                    terminate(&mut child, !opts.echo);
                    break Err(Status::TimedOut(limit));
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        for handle in [drain, collect].into_iter().flatten() {
            wait_for_drain(handle);
        }
        let stdout = captured.lock().map(|out| out.clone()).unwrap_or_default();
        let stderr = tail
            .lock()
            .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        let status = match finished {
            Ok(status) => classify(program, status)?,
            Err(status) => status,
        };

        Ok(Exit {
            status,
            stdout,
            stderr,
        })
    }
}

fn classify(program: &str, status: ExitStatus) -> Result<Status> {
    if status.signal() == Some(Signal::SIGINT as i32) || status.code() == Some(SIGINT_EXIT_CODE)
    {
        return Err(Error::Interrupted {
            program: program.to_string(),
        });
    }

    if status.success() {
        Ok(Status::Success)
    } else {
        Ok(Status::Failed(status.code()))
    }
}

/// SIGTERM first so sudo and AUR helpers can pass it on to the real
/// installer, then SIGKILL once the grace period runs out. With `group`
/// set the signals go to the child's whole process group.
fn terminate(child: &mut Child, group: bool) {
    let pid = Pid::from_raw(child.id() as i32);
    let send = |signal: Signal| {
        let sent = if group {
            killpg(pid, signal)
        } else {
            kill(pid, signal)
        };
        if let Err(errno) = sent {
            tracing::debug!(%pid, ?signal, %errno, "signal not delivered");
        }
    };

    send(Signal::SIGTERM);

    let deadline = Instant::now() + KILL_GRACE;
    let mut exited = false;
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            exited = true;
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    // Group members may outlive the leader, so the group always gets SIGKILL
    if group || !exited {
        send(Signal::SIGKILL);
    }
    let _ = child.wait();
}

fn spawn_drain<R>(stream: R, tail: Arc<Mutex<VecDeque<String>>>, echo: bool) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if echo {
                eprintln!("{}", line);
            }
            if let Ok(mut lines) = tail.lock() {
                if lines.len() == STDERR_TAIL_LINES {
                    lines.pop_front();
                }
                lines.push_back(line);
            }
        }
    })
}

fn spawn_collect<R>(mut stream: R, captured: Arc<Mutex<String>>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = stream.read_to_string(&mut buf);
        if let Ok(mut out) = captured.lock() {
            *out = buf;
        }
    })
}

/// Grandchildren may keep the pipe open after the direct child exits, so
/// the drain thread only gets a short grace period before it is abandoned.
fn wait_for_drain(handle: JoinHandle<()>) {
    let deadline = Instant::now() + DRAIN_GRACE;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if handle.is_finished() {
        let _ = handle.join();
    }
}
