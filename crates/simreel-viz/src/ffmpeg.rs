//! MP4 encoding through an `ffmpeg` child process

use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::debug;

use simreel_core::{Frame, Result, SimError};

/// Map the 0–10 quality scale (10 = best) onto x264's CRF.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quality_to_crf(quality: u8) -> u8 {
    let q = f64::from(quality.min(10)) / 10.0;
    ((1.0 - q) * 51.0).round() as u8
}

/// Arguments for reading raw RGB frames on stdin and writing an MP4 file
pub(crate) fn encoder_args(
    output: &Path,
    width: u32,
    height: u32,
    fps: u32,
    quality: Option<u8>,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.push(format!("{width}x{height}"));
    args.extend(["-r".to_string(), fps.to_string()]);
    args.extend(["-i", "-", "-an", "-vcodec", "libx264", "-pix_fmt", "yuv420p"].map(String::from));
    // yuv420p needs even dimensions
    args.extend(["-vf".to_string(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string()]);
    if let Some(quality) = quality {
        args.extend(["-crf".to_string(), quality_to_crf(quality).to_string()]);
    }
    args.extend(["-f".to_string(), "mp4".to_string()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Running encoder fed through its stdin
pub(crate) struct FfmpegPipe {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegPipe {
    pub(crate) fn spawn(program: &str, args: &[String]) -> Result<Self> {
        debug!(program, ?args, "spawning encoder");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SimError::Video(format!("failed to start `{program}`: {e}")))?;
        let stdin = child.stdin.take();
        Ok(Self {
            child: Some(child),
            stdin,
        })
    }

    pub(crate) fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SimError::Video("encoder input already closed".to_string()))?;
        match stdin.write_all(frame.as_raw()) {
            Ok(()) => Ok(()),
            Err(err) => {
                // The encoder usually died; its stderr says why
                let stderr = self.reap();
                Err(SimError::Video(format!(
                    "encoder stopped accepting frames: {err}{}",
                    if stderr.is_empty() {
                        String::new()
                    } else {
                        format!(": {stderr}")
                    }
                )))
            }
        }
    }

    /// Close stdin, wait for the child and return its stderr
    fn reap(&mut self) -> String {
        drop(self.stdin.take());
        match self.child.take().map(Child::wait_with_output) {
            Some(Ok(output)) => String::from_utf8_lossy(&output.stderr).trim().to_string(),
            Some(Err(err)) => format!("waiting for encoder failed: {err}"),
            None => String::new(),
        }
    }

    /// Close stdin and wait for the encoder to finish the container
    pub(crate) fn finish(mut self) -> Result<()> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Ok(());
        };
        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SimError::Video(format!(
                "encoder exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

impl Drop for FfmpegPipe {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}
