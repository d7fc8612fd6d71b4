//! # Remote process interface.
//!
//! The coordinator talks to worker and target identities only through
//! [`RemoteExecutor`] (run a command, copy a file either way) and [`Fleet`]
//! (discover identities). Command output is streamed chunk by chunk into an
//! [`OutputSink`]:
//!
//! ```text
//! remote stdout ──┐                     ┌─► Vec<u8>      (combined capture)
//!                 ├─► OutputSink::write ┤
//! remote stderr ──┘                     └─► ResultFile   (file, plus mirror for stdout)
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{ClusterError, RemoteError};

/// Which stream of the remote command a chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Destination for the output of a remote command.
#[async_trait]
pub trait OutputSink: Send {
    /// Receives one chunk of output.
    async fn write(&mut self, stream: OutputStream, chunk: &[u8]) -> io::Result<()>;
}

/// Combined stdout/stderr capture.
#[async_trait]
impl OutputSink for Vec<u8> {
    async fn write(&mut self, _stream: OutputStream, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Runs commands on, and copies files to and from, remote identities.
#[async_trait]
pub trait RemoteExecutor: Send + Sync + 'static {
    /// Runs `command` on `target`, streaming its output into `output`.
    ///
    /// A non-zero exit is reported as [`RemoteError::Exit`].
    async fn exec(
        &self,
        target: &str,
        command: &[String],
        output: &mut dyn OutputSink,
    ) -> Result<(), RemoteError>;

    /// Copies `remote` on `target` to the local path `local`.
    async fn copy_from(&self, target: &str, remote: &str, local: &Path) -> Result<(), RemoteError>;

    /// Copies the local path `local` to `remote` on `target`.
    async fn copy_to(&self, local: &Path, target: &str, remote: &str) -> Result<(), RemoteError>;
}

/// Discovers the live worker and target identities.
#[async_trait]
pub trait Fleet: Send + Sync + 'static {
    /// Identities generating load.
    async fn workers(&self) -> Result<Vec<String>, RemoteError>;

    /// Identities receiving load.
    async fn targets(&self) -> Result<Vec<String>, RemoteError>;
}

/// Writer shared between tasks (the live results stream). Cheap to clone.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl SharedWriter {
    /// Wraps `writer`.
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Shares the process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Writes and flushes `chunk` as one unit.
    pub async fn write_all(&self, chunk: &[u8]) -> io::Result<()> {
        let mut w = self.inner.lock().await;
        w.write_all(chunk).await?;
        w.flush().await
    }
}

/// Per-worker result file; stdout is optionally mirrored to a [`SharedWriter`].
pub struct ResultFile {
    path: PathBuf,
    file: File,
    mirror: Option<SharedWriter>,
}

impl ResultFile {
    /// Creates (or truncates) `path`, creating its directory with mode `0700`.
    pub async fn create(path: PathBuf, mirror: Option<SharedWriter>) -> Result<Self, ClusterError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| ClusterError::Io { path, source }
        };

        if let Some(dir) = path.parent() {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(0o700);
            builder.create(dir).await.map_err(io_err(dir))?;
        }
        let file = File::create(&path).await.map_err(io_err(&path))?;
        Ok(Self { path, file, mirror })
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered output to disk.
    pub async fn finish(mut self) -> Result<(), ClusterError> {
        self.file
            .flush()
            .await
            .map_err(|source| ClusterError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl OutputSink for ResultFile {
    async fn write(&mut self, stream: OutputStream, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        if let (OutputStream::Stdout, Some(mirror)) = (stream, &self.mirror) {
            mirror.write_all(chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// In-memory writer whose contents stay readable after being shared.
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl AsyncWrite for Captured {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }
        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_result_file_mirrors_stdout_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("loadtest-out-lt-0.txt");
        let captured = Captured::default();

        let mut out = ResultFile::create(path.clone(), Some(SharedWriter::new(captured.clone())))
            .await
            .unwrap();
        out.write(OutputStream::Stdout, b"ok\n").await.unwrap();
        out.write(OutputStream::Stderr, b"warn\n").await.unwrap();
        out.finish().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ok\nwarn\n");
        assert_eq!(*captured.0.lock().unwrap(), b"ok\n".to_vec());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(path.parent().unwrap()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }
}
