use crate::config::ScriptSettings;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors that can occur while running an external worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to start {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{worker} exited with {}", describe_exit(*code))]
    NonZeroExit {
        worker: String,
        code: Option<i32>,
        /// Whatever the worker printed before failing. Never returned to clients.
        stdout: String,
    },

    #[error("{worker} did not finish within {}s", timeout.as_secs())]
    Timeout { worker: String, timeout: Duration },

    #[error("failed collecting output from {worker}: {source}")]
    Wait {
        worker: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// What a worker receives from the request
#[derive(Debug, Clone)]
pub enum WorkerInput {
    None,
    Stdin(String),
    Arg(PathBuf),
}

/// Output of a worker that exited with code 0
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    pub stdout: String,
    pub elapsed: Duration,
}

/// A single external worker command
///
/// Every call to [`Worker::invoke`] starts exactly one fresh process; nothing
/// is shared between invocations.
#[derive(Debug, Clone)]
pub struct Worker {
    name: String,
    program: OsString,
    base_args: Vec<OsString>,
    timeout: Duration,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<OsString>,
        base_args: Vec<OsString>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            base_args,
            timeout,
        }
    }

    /// Worker running `<interpreter> <scripts_dir>/<script>`
    pub fn script(name: &str, settings: &ScriptSettings, script: &str) -> Self {
        Self::new(
            name,
            settings.interpreter.clone(),
            vec![settings.script_path(script).into_os_string()],
            settings.timeout(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the worker to completion
    ///
    /// Stdout is accumulated and returned only when the process exits with
    /// code 0. Stderr is logged line by line. The child is killed if the
    /// timeout elapses or the returned future is dropped.
    pub async fn invoke(&self, input: WorkerInput) -> Result<WorkerOutput, WorkerError> {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);

        let stdin_text = match input {
            WorkerInput::None => None,
            WorkerInput::Stdin(text) => Some(text),
            WorkerInput::Arg(path) => {
                command.arg(path);
                None
            }
        };

        command
            .stdin(if stdin_text.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(worker = %self.name, "Spawning worker process");
        let started = Instant::now();

        let mut child = command.spawn().map_err(|source| WorkerError::Spawn {
            worker: self.name.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async {
            if let (Some(mut stdin), Some(text)) = (stdin, stdin_text) {
                // A worker may exit without draining stdin; its exit code decides.
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    tracing::warn!(worker = %self.name, "Failed to write worker stdin: {}", e);
                }
                if let Err(e) = stdin.shutdown().await {
                    tracing::debug!(worker = %self.name, "Failed to close worker stdin: {}", e);
                }
            }
        };

        let run = async {
            let (_, output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result.map_err(|source| WorkerError::Wait {
                worker: self.name.clone(),
                source,
            })?,
            Err(_) => {
                tracing::error!(
                    worker = %self.name,
                    "Worker exceeded {}s timeout, killing it",
                    self.timeout.as_secs()
                );
                return Err(WorkerError::Timeout {
                    worker: self.name.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let elapsed = started.elapsed();

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            let line = line.trim();
            if !line.is_empty() {
                tracing::warn!(worker = %self.name, "stderr: {}", line);
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let code = output.status.code();

        tracing::info!(
            worker = %self.name,
            "Worker exited with {} after {}ms",
            describe_exit(code),
            elapsed.as_millis()
        );

        if output.status.success() {
            Ok(WorkerOutput { stdout, elapsed })
        } else {
            Err(WorkerError::NonZeroExit {
                worker: self.name.clone(),
                code,
                stdout,
            })
        }
    }
}

/// The three workers the gateway dispatches to
#[derive(Debug, Clone)]
pub struct Workers {
    /// Answers natural-language questions read from stdin
    pub query: Worker,
    /// Extracts text from the document path given as last argument
    pub extraction: Worker,
    /// Sends personalised emails; exit code is the only signal
    pub email: Worker,
}

impl Workers {
    pub fn from_settings(settings: &ScriptSettings) -> Self {
        Self {
            query: Worker::script("query", settings, &settings.query_script),
            extraction: Worker::script("extraction", settings, &settings.extraction_script),
            email: Worker::script("email", settings, &settings.email_script),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workers_from_settings() {
        let settings = ScriptSettings::default();
        let workers = Workers::from_settings(&settings);

        assert_eq!(workers.query.name(), "query");
        assert_eq!(workers.extraction.name(), "extraction");
        assert_eq!(workers.email.name(), "email");
        assert_eq!(workers.query.program, OsString::from("python"));
        assert_eq!(
            workers.extraction.base_args,
            vec![PathBuf::from("python").join("ocr.py").into_os_string()]
        );
        assert_eq!(workers.email.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_error_messages() {
        let err = WorkerError::NonZeroExit {
            worker: "query".to_string(),
            code: Some(2),
            stdout: String::new(),
        };
        assert_eq!(err.to_string(), "query exited with code 2");

        let err = WorkerError::NonZeroExit {
            worker: "email".to_string(),
            code: None,
            stdout: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));

        let err = WorkerError::Timeout {
            worker: "extraction".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "extraction did not finish within 5s");
    }
}
