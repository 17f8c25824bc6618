// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Bounded execution of external discovery tools

use std::{
    io::Read,
    process::{Command, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `program` with `args` and returns its stdout.
///
/// The child is killed once `timeout` elapses, which is reported as
/// [`Error::Timeout`]. A non-zero exit is [`Error::CommandFailed`].
pub(crate) fn run(program: &str, args: &[&str], timeout: Duration) -> Result<String, Error> {
    debug!("Running {program} {}", args.join(" "));
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Unavailable(format!("{program} stdout")))?;

    // Drain stdout on a thread so a chatty child cannot block on a full pipe
    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let res = stdout.read_to_end(&mut buf);
        let _ = tx.send(res.map(|_| buf));
    });

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            warn!("{program} exceeded {timeout:?}, killing");
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            return Err(Error::Timeout {
                program: program.to_owned(),
                after: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let _ = reader.join();
    let buf = rx
        .recv()
        .map_err(|_| Error::Unavailable(format!("{program} stdout")))??;

    if !status.success() {
        return Err(Error::CommandFailed {
            program: program.to_owned(),
            status: status.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_stdout() {
        let out = run("sh", &["-c", "echo one; echo two"], Duration::from_secs(5)).unwrap();
        assert_eq!(out.lines().collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[test]
    fn test_run_reports_failure() {
        let err = run("sh", &["-c", "exit 3"], Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn test_run_times_out() {
        let err = run("sleep", &["5"], Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_run_missing_program() {
        let err = run("definitely-not-a-real-tool", &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::IO(_)));
    }
}
