use std::{
    io::Read as _,
    process::{Child, ChildStdin, Command, Stdio},
    sync::mpsc,
    thread::JoinHandle,
};

use crate::{
    compositor::FrameRgba,
    encoder::{Codec, EncodeSettings, EncodedChunk, EncoderBackend},
    error::{ScenecapError, ScenecapResult},
};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streaming encoder backed by the system `ffmpeg` binary: raw RGBA frames
/// go in over stdin, encoded container bytes come back over stdout in
/// chunks. We use the binary rather than linking FFmpeg to avoid native
/// dev header/lib requirements.
pub struct FfmpegEncoder {
    encoder_list: String,
    active: Option<ActiveEncode>,
}

struct ActiveEncode {
    child: Child,
    stdin: Option<ChildStdin>,
    chunk_rx: mpsc::Receiver<EncodedChunk>,
    reader: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<String>>,
}

impl FfmpegEncoder {
    /// Probe ffmpeg availability and its compiled-in encoders once.
    pub fn detect() -> ScenecapResult<Self> {
        if !is_ffmpeg_on_path() {
            return Err(ScenecapError::encoder_unavailable(
                "ffmpeg was not found on PATH",
            ));
        }

        let output = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                ScenecapError::encoder_unavailable(format!("failed to list ffmpeg encoders: {e}"))
            })?;

        Ok(Self {
            encoder_list: String::from_utf8_lossy(&output.stdout).into_owned(),
            active: None,
        })
    }

    fn active_mut(&mut self) -> ScenecapResult<&mut ActiveEncode> {
        self.active
            .as_mut()
            .ok_or_else(|| ScenecapError::validation("ffmpeg encoder was never started"))
    }
}

fn encoder_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Mp4 | Codec::Mp4H264 => "libx264",
        Codec::WebmVp9 => "libvpx-vp9",
        Codec::WebmVp8 | Codec::Webm => "libvpx",
    }
}

/// Full ffmpeg argument list for one encode. MP4 output is fragmented so it
/// can stream to a pipe without a seekable output.
fn build_args(codec: Codec, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("{}x{}", settings.width, settings.height));
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    args.extend(["-i".to_string(), "pipe:0".to_string()]);
    args.push("-an".to_string());
    args.extend(["-c:v".to_string(), encoder_name(codec).to_string()]);
    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    args.extend(["-b:v".to_string(), settings.bitrate_bps.to_string()]);

    match codec {
        Codec::Mp4 => {
            args.extend([
                "-movflags".to_string(),
                "+frag_keyframe+empty_moov".to_string(),
                "-f".to_string(),
                "mp4".to_string(),
            ]);
        }
        Codec::Mp4H264 => {
            args.extend([
                "-profile:v".to_string(),
                "baseline".to_string(),
                "-movflags".to_string(),
                "+frag_keyframe+empty_moov".to_string(),
                "-f".to_string(),
                "mp4".to_string(),
            ]);
        }
        Codec::WebmVp9 | Codec::WebmVp8 | Codec::Webm => {
            args.extend(["-f".to_string(), "webm".to_string()]);
        }
    }

    args.push("pipe:1".to_string());
    args
}

impl EncoderBackend for FfmpegEncoder {
    fn supports(&self, codec: Codec) -> bool {
        // `ffmpeg -encoders` lines look like ` V....D libx264  H.264 ...`;
        // match the exact encoder token so libvpx does not match libvpx-vp9.
        let name = encoder_name(codec);
        self.encoder_list
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(name))
    }

    fn start(&mut self, codec: Codec, settings: &EncodeSettings) -> ScenecapResult<()> {
        settings.validate()?;
        if self.active.is_some() {
            return Err(ScenecapError::validation("ffmpeg encoder already started"));
        }

        let mut child = Command::new("ffmpeg")
            .args(build_args(codec, settings))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ScenecapError::encoder_unavailable(format!("failed to spawn ffmpeg: {e}"))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScenecapError::encoder_unavailable("failed to open ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScenecapError::encoder_unavailable("failed to open ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScenecapError::encoder_unavailable("failed to open ffmpeg stderr"))?;

        // Stdout must be drained concurrently with stdin writes or the
        // pipe fills up and both sides deadlock.
        let (chunk_tx, chunk_rx) = mpsc::channel::<EncodedChunk>();
        let reader = std::thread::spawn(move || {
            let mut buf = [0u8; 64 * 1024];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if chunk_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let stderr_reader = std::thread::spawn(move || {
            let mut out = String::new();
            let _ = stderr.read_to_string(&mut out);
            out
        });

        tracing::info!(codec = codec.label(), "ffmpeg encode started");
        self.active = Some(ActiveEncode {
            child,
            stdin: Some(stdin),
            chunk_rx,
            reader: Some(reader),
            stderr: Some(stderr_reader),
        });
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameRgba) -> ScenecapResult<()> {
        let active = self.active_mut()?;
        let Some(stdin) = active.stdin.as_mut() else {
            return Err(ScenecapError::validation("ffmpeg stdin already closed"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            ScenecapError::Other(anyhow::anyhow!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn poll_chunks(&mut self) -> ScenecapResult<Vec<EncodedChunk>> {
        let active = self.active_mut()?;
        Ok(active.chunk_rx.try_iter().collect())
    }

    fn stop(&mut self) -> ScenecapResult<()> {
        let active = self.active_mut()?;

        // Closing stdin signals end-of-stream; ffmpeg then flushes and exits.
        drop(active.stdin.take());
        if let Some(reader) = active.reader.take() {
            let _ = reader.join();
        }

        let status = active.child.wait().map_err(|e| {
            ScenecapError::finalize_failed(format!("failed to wait for ffmpeg: {e}"))
        })?;

        if !status.success() {
            let stderr = active
                .stderr
                .take()
                .and_then(|h| h.join().ok())
                .unwrap_or_default();
            return Err(ScenecapError::finalize_failed(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }

        tracing::info!("ffmpeg encode finished");
        Ok(())
    }
}

impl Drop for ActiveEncode {
    fn drop(&mut self) {
        // Abort path: the child may still be running. Kill it rather than
        // leaking a process that keeps consuming the pipe.
        drop(self.stdin.take());
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        if let Some(stderr) = self.stderr.take() {
            let _ = stderr.join();
        }
    }
}
