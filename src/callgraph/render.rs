//! External graph rendering.
//!
//! The DOT description is piped into an external program (Graphviz `dot` by
//! default) that writes the image to stdout. The program may be missing, may
//! fail, or may hang; all three come back as a [`RenderError`].

use crate::utils::config::{RendererConfig, DEFAULT_RENDERER_PROGRAM, DEFAULT_RENDER_TIMEOUT};
use crate::utils::error::RenderError;
use log::{debug, warn};
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Turns a DOT graph description into image bytes
pub trait GraphRenderer: Send + Sync {
    fn render(&self, dot: &str, format: ImageFormat) -> Result<Vec<u8>, RenderError>;

    /// Name of the external dependency, for operator-facing messages
    fn program(&self) -> &str;
}

/// Renderer that runs `<program> [args...] -T<format>` as a subprocess
#[derive(Debug, Clone)]
pub struct DotRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for DotRenderer {
    fn default() -> Self {
        Self {
            program: DEFAULT_RENDERER_PROGRAM.to_string(),
            args: Vec::new(),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

impl DotRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout(),
        }
    }

    /// Arguments passed before the `-T<format>` flag
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn read_all(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Drain `pipe` on a helper thread; the result arrives on the returned channel
fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(pipe) => {
            thread::spawn(move || {
                let _ = tx.send(read_all(pipe));
            });
        }
        None => {
            let _ = tx.send(Ok(Vec::new()));
        }
    }
    rx
}

/// Kill and reap the child; either may fail if it already exited
fn abort(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Outcome of waiting on something that has to finish before the deadline
enum Waited<T> {
    Done(T),
    Expired,
}

fn recv_until(rx: &mpsc::Receiver<io::Result<Vec<u8>>>, deadline: Instant) -> io::Result<Waited<Vec<u8>>> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.map(Waited::Done),
        Err(RecvTimeoutError::Timeout) => Ok(Waited::Expired),
        Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
            io::ErrorKind::Other,
            "renderer pipe reader panicked",
        )),
    }
}

impl DotRenderer {
    fn timed_out(&self, child: &mut Child) -> RenderError {
        warn!(
            "Renderer `{}` timed out after {:?}, killing it",
            self.program, self.timeout
        );
        abort(child);
        RenderError::Timeout {
            program: self.program.clone(),
            timeout: self.timeout,
        }
    }

    /// Wait for the child to exit and both pipes to close, all within one deadline
    fn collect(&self, child: &mut Child, deadline: Instant) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), RenderError> {
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    abort(child);
                    return Err(err.into());
                }
            }
            if Instant::now() >= deadline {
                return Err(self.timed_out(child));
            }
            thread::sleep(POLL_INTERVAL);
        };

        // A descendant of the renderer can keep the pipes open after it exits
        let image = match recv_until(&stdout, deadline)? {
            Waited::Done(bytes) => bytes,
            Waited::Expired => return Err(self.timed_out(child)),
        };
        let errors = match recv_until(&stderr, deadline)? {
            Waited::Done(bytes) => bytes,
            Waited::Expired => return Err(self.timed_out(child)),
        };

        Ok((status, image, errors))
    }
}

impl GraphRenderer for DotRenderer {
    fn render(&self, dot: &str, format: ImageFormat) -> Result<Vec<u8>, RenderError> {
        debug!(
            "Rendering {} bytes of DOT with `{}` as {}",
            dot.len(),
            self.program,
            format.as_str()
        );

        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(format!("-T{}", format.as_str()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Unavailable {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin and drain stdout/stderr on helper threads so a child that
        // stops reading or writing cannot block the request past the deadline.
        if let Some(mut stdin) = child.stdin.take() {
            let input = dot.as_bytes().to_vec();
            thread::spawn(move || {
                // A child that exits early closes the pipe; its exit status
                // reports the failure.
                let _ = stdin.write_all(&input);
            });
        }

        let (status, image, errors) = self.collect(&mut child, deadline)?;

        if !status.success() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&errors).trim().to_string(),
            });
        }
        if image.is_empty() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
                stderr: "no image data on stdout".to_string(),
            });
        }

        debug!("Renderer produced {} bytes", image.len());
        Ok(image)
    }

    fn program(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unavailable() {
        let renderer = DotRenderer::new("/nonexistent/graphviz/dot");
        let result = renderer.render("digraph {}", ImageFormat::Png);
        assert!(matches!(result, Err(RenderError::Unavailable { .. })));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ImageFormat::Png.as_str(), "png");
        assert_eq!(ImageFormat::Png.content_type(), "image/png");
        assert_eq!(ImageFormat::Svg.content_type(), "image/svg+xml");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_is_collected() {
        // `sh -c cat sh -Tpng` echoes stdin back
        let renderer = DotRenderer::new("sh").with_args(["-c", "cat", "sh"]);
        let bytes = renderer.render("digraph { a -> b }", ImageFormat::Png).unwrap();
        assert_eq!(bytes, b"digraph { a -> b }");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failure() {
        let renderer = DotRenderer::new("sh").with_args(["-c", "echo broken >&2; exit 3", "sh"]);
        match renderer.render("digraph {}", ImageFormat::Png) {
            Err(RenderError::Failed { stderr, .. }) => assert_eq!(stderr, "broken"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_hanging_renderer_times_out() {
        let renderer = DotRenderer::new("sh")
            .with_args(["-c", "exec sleep 5", "sh"])
            .with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let result = renderer.render("digraph {}", ImageFormat::Png);

        assert!(matches!(result, Err(RenderError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_background_child_holding_stdout_times_out() {
        // The shell exits at once but `sleep` inherits and keeps stdout open
        let renderer = DotRenderer::new("sh")
            .with_args(["-c", "sleep 3 & exit 0", "sh"])
            .with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let result = renderer.render("digraph {}", ImageFormat::Png);

        assert!(matches!(result, Err(RenderError::Timeout { .. })), "got {:?}", result);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_failure() {
        let renderer = DotRenderer::new("sh").with_args(["-c", "cat >/dev/null", "sh"]);
        let result = renderer.render("digraph {}", ImageFormat::Png);
        assert!(matches!(result, Err(RenderError::Failed { .. })), "got {:?}", result);
    }

    #[cfg(unix)]
    #[test]
    fn test_abort_reaps_running_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        abort(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }
}
