//! Collection agent drivers.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::PipelineConfig;

use super::error::PipelineError;

/// Agent output is kept as a bounded tail for job results and failure
/// messages.
pub const OUTPUT_TAIL_CAP: usize = 3000;

/// Result of one agent batch invocation.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// Last portion of the agent's stdout, at most [`OUTPUT_TAIL_CAP`] chars.
    pub stdout_tail: String,
}

/// Runs the external collection agent for one batch of product URLs.
#[async_trait]
pub trait CollectionAgent: Send + Sync {
    async fn run_batch(
        &self,
        output_dir: &Path,
        urls: &[String],
    ) -> Result<BatchOutput, PipelineError>;
}

/// Drives the agent as a child process.
///
/// The configured command is invoked per batch as
/// `<command...> <output_dir> --url <url> [--url <url> ...]`.
pub struct ProcessAgent {
    command: Vec<String>,
    timeout_secs: u64,
}

impl ProcessAgent {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            command: config.agent_command.clone(),
            timeout_secs: config.batch_timeout_secs,
        }
    }
}

/// Append a line to a tail buffer, keeping only the last `cap` chars.
pub(crate) fn push_tail(tail: &mut String, line: &str, cap: usize) {
    tail.push_str(line);
    tail.push('\n');
    if tail.len() > cap {
        let mut cut = tail.len() - cap;
        while !tail.is_char_boundary(cut) {
            cut += 1;
        }
        tail.drain(..cut);
    }
}

#[async_trait]
impl CollectionAgent for ProcessAgent {
    async fn run_batch(
        &self,
        output_dir: &Path,
        urls: &[String],
    ) -> Result<BatchOutput, PipelineError> {
        let (program, base_args) = self
            .command
            .split_first()
            .ok_or_else(|| PipelineError::AgentSpawn {
                reason: "agent command is empty".to_string(),
            })?;

        let mut args: Vec<String> = base_args.to_vec();
        args.push(output_dir.to_string_lossy().to_string());
        for url in urls {
            args.push("--url".to_string());
            args.push(url.clone());
        }

        debug!(program, url_count = urls.len(), "starting collection agent batch");

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PipelineError::AgentSpawn {
                reason: format!("{program}: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| PipelineError::AgentSpawn {
            reason: "stdout not captured".to_string(),
        })?;
        let mut reader = BufReader::new(stdout).lines();

        let timeout_duration = Duration::from_secs(self.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut tail = String::new();
            while let Ok(Some(line)) = reader.next_line().await {
                push_tail(&mut tail, &line, OUTPUT_TAIL_CAP);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, tail))
        })
        .await;

        match result {
            Ok(Ok((status, tail))) => {
                if !status.success() {
                    return Err(PipelineError::AgentFailed {
                        detail: format!("exit code {:?}; output tail: {}", status.code(), tail),
                    });
                }
                Ok(BatchOutput { stdout_tail: tail })
            }
            Ok(Err(e)) => Err(PipelineError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(PipelineError::AgentTimeout {
                    secs: self.timeout_secs,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_tail_under_cap() {
        let mut tail = String::new();
        push_tail(&mut tail, "hello", 100);
        push_tail(&mut tail, "world", 100);
        assert_eq!(tail, "hello\nworld\n");
    }

    #[test]
    fn test_push_tail_keeps_end() {
        let mut tail = String::new();
        for i in 0..100 {
            push_tail(&mut tail, &format!("line-{i}"), 30);
        }
        assert!(tail.len() <= 30);
        assert!(tail.ends_with("line-99\n"));
    }

    #[test]
    fn test_push_tail_char_boundary() {
        let mut tail = String::new();
        for _ in 0..20 {
            push_tail(&mut tail, "数据采集中", 32);
        }
        assert!(tail.len() <= 35);
        assert!(tail.ends_with("数据采集中\n"));
    }

    #[tokio::test]
    async fn test_empty_command_fails_to_spawn() {
        let agent = ProcessAgent {
            command: vec![],
            timeout_secs: 5,
        };
        let err = agent
            .run_batch(Path::new("/tmp"), &["https://example.com".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AgentSpawn { .. }));
    }

    #[tokio::test]
    async fn test_slow_agent_is_killed_on_timeout() {
        // sh -c ignores the appended output-dir positional argument.
        let agent = ProcessAgent {
            command: vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()],
            timeout_secs: 1,
        };
        let started = std::time::Instant::now();
        let err = agent.run_batch(Path::new("/tmp"), &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::AgentTimeout { secs: 1 }));
        // The child was killed at the deadline, not waited out.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let agent = ProcessAgent {
            command: vec!["rankwatch-agent-does-not-exist".to_string()],
            timeout_secs: 5,
        };
        let err = agent.run_batch(Path::new("/tmp"), &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::AgentSpawn { .. }));
    }
}
