//! External doc-tool invocation with a hard per-file timeout.

use super::normalize::{parse_module_docs, ModuleDoc};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Poll interval while waiting for the tool to exit
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Default per-file extraction timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a single file's extraction failed
///
/// Callers decide fatality: the sync batch logs and substitutes an empty
/// result, the update hook reports and exits cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot run {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("tool exited with {status}")]
    NonZeroExit { status: ExitStatus },
    #[error("malformed tool output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Doc-tool command line: program plus leading args, file path appended last
#[derive(Debug, Clone)]
pub struct DocTool {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for DocTool {
    fn default() -> Self {
        Self {
            program: "bunx".to_string(),
            args: vec!["rescript-tools".to_string(), "doc".to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DocTool {
    /// Extract and normalize one file's module trees
    ///
    /// # Arguments
    /// * `file` - candidate file under the package's `lib/ocaml`
    /// * `cwd` - package directory the tool runs in
    /// * `extra_env` - extra environment entries for this invocation
    pub fn extract(
        &self,
        file: &Path,
        cwd: &Path,
        extra_env: &[(String, String)],
    ) -> Result<Vec<ModuleDoc>, ExtractError> {
        let stdout = self.run_raw(file, cwd, extra_env)?;
        let doc_json: Value = serde_json::from_slice(&stdout)?;
        Ok(parse_module_docs(&doc_json))
    }

    /// Run the tool and capture stdout, killing it at the timeout
    fn run_raw(
        &self,
        file: &Path,
        cwd: &Path,
        extra_env: &[(String, String)],
    ) -> Result<Vec<u8>, ExtractError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(file)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for (key, value) in extra_env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ExtractError::Io {
            tool: self.program.clone(),
            source,
        })?;

        // Drain stdout on its own thread so a chatty tool cannot deadlock
        // against a full pipe while we poll for exit.
        let stdout_pipe = child.stdout.take();
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExtractError::Timeout {
                            timeout_secs: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(WAIT_STEP);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExtractError::Io {
                        tool: self.program.clone(),
                        source,
                    });
                }
            }
        };

        let stdout = reader.join().unwrap_or_default();
        if !status.success() {
            return Err(ExtractError::NonZeroExit { status });
        }
        Ok(stdout)
    }
}
