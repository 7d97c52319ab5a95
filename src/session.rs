use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{
    compositor::composite,
    config::CaptureConfig,
    encoder::{Codec, EncodeSettings, EncoderAdapter, EncoderBackend, RecordedVideo},
    error::{ScenecapError, ScenecapResult},
    sampler::{sample_time, total_frames},
    seek::seek,
    surface::{RenderSurface, SelectorChain, SourceGeometry},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Preparing,
    Capturing,
    Finalizing,
    Complete,
    Aborted,
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Capturing => "capturing",
            Self::Finalizing => "finalizing",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Pacing of the cooperative capture loop. Capture is not real-time: these
/// delays only give the surface time to settle paints and the encoder time
/// to keep up, and tests zero them out.
#[derive(Clone, Copy, Debug)]
pub struct SessionTuning {
    /// Delay after the administrative seek to 0, before the first frame.
    pub prepare_settle: Duration,
    /// Per-frame delay between seek and snapshot (one paint tick).
    pub frame_settle: Duration,
    /// Delay between frames, tuned to the encoder's expected cadence.
    pub frame_pacing: Duration,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            prepare_settle: Duration::from_millis(300),
            frame_settle: Duration::from_millis(5),
            frame_pacing: Duration::from_millis(50),
        }
    }
}

impl SessionTuning {
    pub fn immediate() -> Self {
        Self {
            prepare_settle: Duration::ZERO,
            frame_settle: Duration::ZERO,
            frame_pacing: Duration::ZERO,
        }
    }
}

/// Cooperative cancellation. Cloneable so UI code can hold it while the
/// session runs; abort twice, or abort after completion, is a no-op.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Terminal result of a session run. Abort is a success of the
/// cancellation contract, distinct from failure.
#[derive(Debug)]
pub enum SessionOutcome {
    Complete(RecordedVideo),
    Aborted,
}

/// Orchestrates one capture: validates configuration, prepares the surface
/// and encoder, drives the frame loop and guarantees the encoder is
/// finalized and released on every exit path.
pub struct CaptureSession {
    config: CaptureConfig,
    tuning: SessionTuning,
    selectors: SelectorChain,
    state: SessionState,
    abort: AbortHandle,
    geometry: Option<SourceGeometry>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> ScenecapResult<Self> {
        // Fail fast: invalid configuration never touches the encoder.
        config.validate()?;
        Ok(Self {
            config,
            tuning: SessionTuning::default(),
            selectors: SelectorChain::default(),
            state: SessionState::Idle,
            abort: AbortHandle::default(),
            geometry: None,
        })
    }

    pub fn with_tuning(mut self, tuning: SessionTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorChain) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Drive the session to a terminal state. The surface and backend are
    /// owned exclusively by this session for the duration of the run.
    pub fn run(
        &mut self,
        surface: &mut dyn RenderSurface,
        backend: Box<dyn EncoderBackend>,
        mut progress: impl FnMut(&str),
    ) -> ScenecapResult<SessionOutcome> {
        if self.state != SessionState::Idle {
            return Err(ScenecapError::validation(format!(
                "session already ran (state: {})",
                self.state
            )));
        }

        self.transition(SessionState::Preparing);
        let mut adapter = match self.prepare(surface, backend) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };

        self.transition(SessionState::Capturing);
        let captured = self.capture_loop(surface, &mut adapter, &mut progress);

        self.transition(SessionState::Finalizing);
        match captured {
            Ok(()) => {
                if let Err(e) = adapter.finalize() {
                    self.transition(SessionState::Failed);
                    return Err(e);
                }
                if self.abort.is_aborted() {
                    self.transition(SessionState::Aborted);
                    return Ok(SessionOutcome::Aborted);
                }
                match adapter.take_video() {
                    Ok(video) => {
                        self.transition(SessionState::Complete);
                        Ok(SessionOutcome::Complete(video))
                    }
                    Err(e) => {
                        self.transition(SessionState::Failed);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                // No partial video: release the encoder and surface the
                // original per-frame error.
                let _ = adapter.finalize();
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    fn prepare(
        &mut self,
        surface: &mut dyn RenderSurface,
        backend: Box<dyn EncoderBackend>,
    ) -> ScenecapResult<EncoderAdapter> {
        surface.ensure_ready()?;

        let measured = surface.measure(&self.selectors)?;
        let geometry = SourceGeometry::from_measured(measured);
        tracing::info!(
            measured_width = measured.width,
            measured_height = measured.height,
            source_width = geometry.width,
            source_height = geometry.height,
            "measured capture geometry"
        );

        let mut adapter = EncoderAdapter::negotiate(backend, &Codec::CANDIDATES)?;
        adapter.start(EncodeSettings {
            width: self.config.target_width,
            height: self.config.target_height,
            fps: self.config.fps,
            bitrate_bps: self.config.effective_bitrate_bps(),
        })?;

        // Administrative seek: park the animation at time 0 and let the
        // first frame stabilize before capture begins.
        seek(surface, 0.0)?;
        pause_for(self.tuning.prepare_settle);

        self.geometry = Some(geometry);
        Ok(adapter)
    }

    fn capture_loop(
        &mut self,
        surface: &mut dyn RenderSurface,
        adapter: &mut EncoderAdapter,
        progress: &mut dyn FnMut(&str),
    ) -> ScenecapResult<()> {
        let geometry = self
            .geometry
            .ok_or_else(|| ScenecapError::validation("capture loop before prepare (bug)"))?;
        let total = total_frames(&self.config);
        tracing::info!(total_frames = total, fps = self.config.fps, "capture started");

        for frame_index in 0..total {
            // Cancellation is cooperative: checked at the loop head, so a
            // frame in progress finishes but no further frames start.
            if self.abort.is_aborted() {
                tracing::info!(frame = frame_index, "abort observed, stopping capture");
                return Ok(());
            }

            let t = sample_time(frame_index, &self.config);
            let frame = self
                .capture_one(surface, geometry, t)
                .map_err(|e| ScenecapError::frame_capture(frame_index, e))?;

            // Encoder errors are fatal to the session as-is; they are not
            // per-frame capture failures.
            adapter.write_frame(&frame)?;

            progress(&format!("frame {} of {}", frame_index + 1, total));
            pause_for(self.tuning.frame_pacing);
        }

        Ok(())
    }

    fn capture_one(
        &self,
        surface: &mut dyn RenderSurface,
        geometry: SourceGeometry,
        time_seconds: f64,
    ) -> ScenecapResult<crate::compositor::FrameRgba> {
        seek(surface, time_seconds)?;
        pause_for(self.tuning.frame_settle);
        let snapshot = surface.snapshot()?;
        composite(&snapshot, geometry, &self.config)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }
}

fn pause_for(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}
