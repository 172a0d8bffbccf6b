// src/unit/command.rs

//! Shell-command unit.
//!
//! Runs one command per step and blocks until it exits. A non-zero exit
//! code is a transient failure: the same command is attempted again on the
//! job's next step, so the job's `tries` budget bounds the retries.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::ResumableUnit;

#[derive(Debug)]
pub struct CommandUnit {
    pending: VecDeque<String>,
    working_dir: Option<PathBuf>,
}

impl CommandUnit {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            pending: commands.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.working_dir = if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir.to_path_buf())
        };
        self
    }
}

/// Build a shell command appropriate for the platform.
fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

impl ResumableUnit for CommandUnit {
    fn step(&mut self) -> Result<Option<Value>> {
        let Some(cmd) = self.pending.front().cloned() else {
            return Ok(None);
        };

        info!(cmd = %cmd, "running command");
        let mut command = shell(&cmd);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("spawning process for command '{}'", cmd))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(cmd = %cmd, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            bail!("command '{}' exited with code {}", cmd, code);
        }

        self.pending.pop_front();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(cmd = %cmd, exit_code = code, "command finished");
        Ok(Some(json!({ "cmd": cmd, "stdout": stdout })))
    }

    fn describe(&self) -> String {
        match self.pending.front() {
            Some(next) => format!("command({next})"),
            None => "command(<done>)".to_string(),
        }
    }
}
