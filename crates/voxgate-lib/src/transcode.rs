//! Audio post-processing via an `ffmpeg` subprocess.
//!
//! Provider output is normalized to mono, fixed sample rate, fixed bitrate MP3
//! so small embedded decoders can play every artifact the same way.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tracing::{debug, error};

use voxgate_core::types::TranscodeConfig;

use crate::error::{GatewayError, Result};

/// Stderr kept for error reporting.
const STDERR_TAIL: usize = 2048;

#[derive(Debug, Clone)]
pub struct Transcoder {
    config: TranscodeConfig,
}

impl Transcoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// ffmpeg argument list for one conversion.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let c = &self.config;
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-vn".to_string(),
                "-ac".to_string(),
                c.channels.to_string(),
                "-ar".to_string(),
                c.sample_rate.to_string(),
                "-b:a".to_string(),
                format!("{}k", c.bitrate_kbps),
                "-f".to_string(),
                "mp3".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Re-encode `input` into `output`. Fails with
    /// [`GatewayError::TranscodeFailed`] on spawn failure, non-zero exit,
    /// timeout, or empty output. The child is killed if the call is dropped.
    pub async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let mut child = tokio::process::Command::new(&self.config.ffmpeg_path)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(
                    "transcode: failed to spawn {}: {e}",
                    self.config.ffmpeg_path.display()
                );
                GatewayError::TranscodeFailed(format!("failed to spawn ffmpeg: {e}"))
            })?;

        let mut stderr = child.stderr.take();
        let run = async {
            let mut captured = Vec::new();
            if let Some(ref mut pipe) = stderr {
                // read to EOF so ffmpeg never blocks on a full pipe
                if let Err(e) = pipe.read_to_end(&mut captured).await {
                    debug!("transcode: stderr read failed: {e}");
                }
            }
            let status = child.wait().await;
            (status, captured)
        };

        let (status, captured) = tokio::time::timeout(self.config.timeout, run)
            .await
            .map_err(|_| {
                GatewayError::TranscodeFailed(format!(
                    "ffmpeg did not finish within {:?}",
                    self.config.timeout
                ))
            })?;

        let status = status
            .map_err(|e| GatewayError::TranscodeFailed(format!("failed to wait for ffmpeg: {e}")))?;

        if !status.success() {
            let text = String::from_utf8_lossy(&captured);
            let tail = tail_chars(text.trim(), STDERR_TAIL);
            error!("transcode: ffmpeg exited with {status}: {tail}");
            return Err(GatewayError::TranscodeFailed(format!("ffmpeg exited with {status}")));
        }

        let len = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(GatewayError::TranscodeFailed(
                "ffmpeg produced no output".to_string(),
            ));
        }

        debug!("transcode: {} -> {} ({len} bytes)", input.display(), output.display());
        Ok(())
    }
}

fn tail_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
