//! # `kubectl`-backed remote executor and fleet discovery.
//!
//! | Operation   | Invocation                                                                  |
//! |-------------|-----------------------------------------------------------------------------|
//! | `exec`      | `kubectl exec <pod> -- <command...>`                                         |
//! | `copy_from` | `kubectl cp <pod>:<remote> <local>`                                          |
//! | `copy_to`   | `kubectl cp <local> <pod>:<remote>`                                          |
//! | discovery   | `kubectl get pods -l <selector> --field-selector=status.phase=Running -o name` |
//!
//! `kubectl cp` cannot copy between two pods; the bulk stager goes through the
//! local working directory instead.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::remote::{Fleet, OutputSink, OutputStream, RemoteExecutor};
use crate::config::ClusterConfig;
use crate::error::RemoteError;

/// Talks to pods through the `kubectl` binary.
#[derive(Clone, Debug)]
pub struct Kubectl {
    program: String,
    worker_selector: String,
    target_selector: String,
}

impl Kubectl {
    /// Uses `kubectl` from `PATH` with the selectors of `cfg`.
    pub fn new(cfg: &ClusterConfig) -> Self {
        Self {
            program: "kubectl".to_string(),
            worker_selector: cfg.worker_selector.clone(),
            target_selector: cfg.target_selector.clone(),
        }
    }

    /// Overrides the `kubectl` binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn render(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs `kubectl <args>`, streaming stdout and stderr into `output` as they arrive.
    async fn run(&self, args: &[String], output: &mut dyn OutputSink) -> Result<(), RemoteError> {
        tracing::debug!(command = %self.render(args), "kubectl");
        let mut child = self
            .command(args)
            .spawn()
            .map_err(|source| RemoteError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut out_buf = vec![0u8; 8 * 1024];
        let mut err_buf = vec![0u8; 8 * 1024];

        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                n = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => match n? {
                    0 => stdout = None,
                    n => output.write(OutputStream::Stdout, &out_buf[..n]).await?,
                },
                n = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => match n? {
                    0 => stderr = None,
                    n => output.write(OutputStream::Stderr, &err_buf[..n]).await?,
                },
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(RemoteError::Exit {
                command: self.render(args),
                status: status.to_string(),
            })
        }
    }

    async fn pods(&self, selector: &str) -> Result<Vec<String>, RemoteError> {
        let args = [
            "get",
            "pods",
            "-l",
            selector,
            "--field-selector=status.phase=Running",
            "-o",
            "name",
        ]
        .map(String::from);

        let mut out = Vec::<u8>::new();
        self.run(&args, &mut out).await?;
        Ok(parse_pod_names(&String::from_utf8_lossy(&out)))
    }
}

async fn read_some<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => Ok(0),
    }
}

/// Parses `kubectl get pods -o name` output (`pod/<name>` per line).
fn parse_pod_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.strip_prefix("pod/").unwrap_or(l).to_string())
        .collect()
}

#[async_trait]
impl RemoteExecutor for Kubectl {
    async fn exec(
        &self,
        target: &str,
        command: &[String],
        output: &mut dyn OutputSink,
    ) -> Result<(), RemoteError> {
        let mut args = vec!["exec".to_string(), target.to_string(), "--".to_string()];
        args.extend_from_slice(command);
        self.run(&args, output).await
    }

    async fn copy_from(&self, target: &str, remote: &str, local: &Path) -> Result<(), RemoteError> {
        let args = [
            "cp".to_string(),
            format!("{target}:{remote}"),
            local.display().to_string(),
        ];
        self.run(&args, &mut Vec::<u8>::new()).await
    }

    async fn copy_to(&self, local: &Path, target: &str, remote: &str) -> Result<(), RemoteError> {
        let args = [
            "cp".to_string(),
            local.display().to_string(),
            format!("{target}:{remote}"),
        ];
        self.run(&args, &mut Vec::<u8>::new()).await
    }
}

#[async_trait]
impl Fleet for Kubectl {
    async fn workers(&self) -> Result<Vec<String>, RemoteError> {
        self.pods(&self.worker_selector).await
    }

    async fn targets(&self) -> Result<Vec<String>, RemoteError> {
        self.pods(&self.target_selector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pod_names() {
        let raw = "pod/loadtest-0\npod/loadtest-1\n\n  pod/loadtest-2  \n";
        assert_eq!(
            parse_pod_names(raw),
            vec!["loadtest-0", "loadtest-1", "loadtest-2"]
        );
        assert!(parse_pod_names("").is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streams_both_outputs_and_reports_exit() {
        // `sh -c` stands in for kubectl: the args are passed through untouched.
        let sh = Kubectl::new(&ClusterConfig::default()).with_program("sh");

        let mut out = Vec::<u8>::new();
        let args = ["-c".to_string(), "echo out; echo err 1>&2".to_string()];
        sh.run(&args, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));

        let args = ["-c".to_string(), "exit 3".to_string()];
        match sh.run(&args, &mut Vec::<u8>::new()).await {
            Err(RemoteError::Exit { command, status }) => {
                assert!(command.starts_with("sh -c"));
                assert!(status.contains('3'));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let kubectl = Kubectl::new(&ClusterConfig::default()).with_program("/nonexistent/kubectl");
        let err = kubectl.workers().await.unwrap_err();
        assert!(matches!(err, RemoteError::Spawn { .. }));
    }
}
