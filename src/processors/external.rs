// webp-batch/src/processors/external.rs
use super::compressor::temp_file_beside;
use crate::core::{Backend, ConversionOutcome, ImageToolError, ResizeTarget, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Converts through an external ffmpeg-compatible transcoder.
///
/// The tool is looked up once when the encoder is built; a missing tool
/// turns every call into a `tool-not-found` failure without spawning.
#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    program: Option<PathBuf>,
    requested: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalEncoder {
    pub fn discover(program: &Path, timeout: Option<Duration>) -> Self {
        let resolved = which::which(program).ok();
        match &resolved {
            Some(path) => log::debug!("Using external transcoder at {}", path.display()),
            None => log::warn!("External transcoder {} not found", program.display()),
        }

        Self {
            program: resolved,
            requested: program.to_path_buf(),
            timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }

    pub fn encode(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
        quality: u8,
    ) -> ConversionOutcome {
        match self.try_encode(source, destination, target, quality) {
            Ok(()) => ConversionOutcome::Success { backend: Backend::External },
            Err(e) => ConversionOutcome::BackendFailure {
                backend: Backend::External,
                detail: e.to_string(),
            },
        }
    }

    fn try_encode(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
        quality: u8,
    ) -> Result<()> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| ImageToolError::ToolNotFound(self.requested.display().to_string()))?;

        // The tool picks its muxer from the extension, so the temp file keeps `.webp`.
        let temp = temp_file_beside(destination, ".webp")?;
        let mut command = build_command(program, source, temp.path(), target, quality);
        log::debug!("Running {:?}", command);

        self.run(&mut command)?;

        temp.persist(destination).map_err(|e| ImageToolError::Io(e.error))?;
        Ok(())
    }

    fn run(&self, command: &mut Command) -> Result<()> {
        // Wrapper scripts fork; a group of their own lets a timeout reach the whole tree.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ImageToolError::ExternalTool(format!("failed to spawn: {}", e)))?;

        let mut stderr_pipe = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || {
            let mut buffer = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut buffer);
            }
            buffer
        });

        let status = match self.timeout {
            Some(timeout) => match wait_with_timeout(&mut child, timeout)? {
                Some(status) => status,
                None => {
                    kill_tree(&mut child);
                    let _ = child.wait();
                    // Not joined: a survivor may still hold stderr open.
                    return Err(ImageToolError::Timeout(timeout));
                }
            },
            None => child.wait()?,
        };

        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ImageToolError::ExternalTool(format!(
                "exit status {}: {}",
                code,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: signals only the group created for this child at spawn.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// ffmpeg `scale` filter for `target`; `-1` lets ffmpeg derive the other side.
pub fn scale_filter(target: ResizeTarget) -> Option<String> {
    match (target.width, target.height) {
        (Some(w), Some(h)) => Some(format!("scale={}:{}", w, h)),
        (Some(w), None) => Some(format!("scale={}:-1", w)),
        (None, Some(h)) => Some(format!("scale=-1:{}", h)),
        (None, None) => None,
    }
}

pub fn build_command(
    program: &Path,
    source: &Path,
    output: &Path,
    target: ResizeTarget,
    quality: u8,
) -> Command {
    let mut command = Command::new(program);
    command
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(source);

    if let Some(filter) = scale_filter(target) {
        command.arg("-vf").arg(filter);
    }

    command.arg("-quality").arg(quality.to_string()).arg(output);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn scale_filter_variants() {
        assert_eq!(scale_filter(ResizeTarget::new(Some(800), Some(600))).as_deref(), Some("scale=800:600"));
        assert_eq!(scale_filter(ResizeTarget::new(Some(800), None)).as_deref(), Some("scale=800:-1"));
        assert_eq!(scale_filter(ResizeTarget::new(None, Some(600))).as_deref(), Some("scale=-1:600"));
        assert_eq!(scale_filter(ResizeTarget::default()), None);
    }

    #[test]
    fn command_without_resize_has_no_filter() {
        let command = build_command(
            Path::new("ffmpeg"),
            Path::new("in/clip.heic"),
            Path::new("out/clip.webp"),
            ResizeTarget::default(),
            60,
        );
        let args: Vec<&OsStr> = command.get_args().collect();

        assert_eq!(
            args,
            ["-hide_banner", "-loglevel", "error", "-y", "-i", "in/clip.heic", "-quality", "60", "out/clip.webp"]
                .map(OsStr::new)
        );
    }

    #[test]
    fn command_with_width_adds_scale() {
        let command = build_command(
            Path::new("ffmpeg"),
            Path::new("a.avif"),
            Path::new("a.webp"),
            ResizeTarget::new(Some(320), None),
            90,
        );
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=320:-1");
        assert_eq!(args.last().map(String::as_str), Some("a.webp"));
    }

    #[test]
    fn missing_tool_fails_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = ExternalEncoder::discover(
            Path::new("definitely-not-a-real-transcoder-4821"),
            None,
        );
        assert!(!encoder.is_available());

        let destination = dir.path().join("x.webp");
        let outcome = encoder.encode(
            Path::new("x.heic"),
            &destination,
            ResizeTarget::default(),
            60,
        );

        assert_eq!(
            outcome,
            ConversionOutcome::BackendFailure {
                backend: Backend::External,
                detail: "tool-not-found".to_string(),
            }
        );
        assert!(!destination.exists());
    }
}
