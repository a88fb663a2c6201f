//! Process execution service: run one external command, capture its exit
//! code, stdout bytes, and stderr text. Never retries.

use std::io::Write;
use std::process::{Command, Stdio};

use kiln_core::{KilnError, KilnResult};

/// Captured result of one command invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Seam for command execution so the resolver can be exercised without
/// spawning anything.
pub trait ProcessRunner {
    fn execute(
        &self,
        command: &str,
        args: &[String],
        input: Option<&[u8]>,
    ) -> KilnResult<ProcessOutput>;
}

/// Real implementation over `std::process::Command`.
///
/// No timeout is applied: a hung command blocks the harness, matching the
/// source system's behavior. Wrap the runner externally if a deadline is
/// needed.
#[derive(Debug, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn execute(
        &self,
        command: &str,
        args: &[String],
        input: Option<&[u8]>,
    ) -> KilnResult<ProcessOutput> {
        let process_error = |source: std::io::Error| KilnError::Process {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(command)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(process_error)?;

        if let Some(payload) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(payload).map_err(process_error)?;
            }
        }

        let output = child.wait_with_output().map_err(process_error)?;
        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// First non-empty line of a diagnostic text, trimmed; empty string when
/// there is none.
pub fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or("").trim()
}
