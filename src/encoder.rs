use crate::{
    compositor::FrameRgba,
    error::{ScenecapError, ScenecapResult},
};

/// Opaque encoded byte buffer, ordered by emission time.
pub type EncodedChunk = Vec<u8>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    Mp4,
    Mp4H264,
    WebmVp9,
    WebmVp8,
    Webm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Webm,
}

impl Codec {
    /// Negotiation priority: most-compatible container first, then
    /// progressively more widely supported fallbacks.
    pub const CANDIDATES: [Codec; 5] = [
        Codec::Mp4,
        Codec::Mp4H264,
        Codec::WebmVp9,
        Codec::WebmVp8,
        Codec::Webm,
    ];

    pub fn container(self) -> Container {
        match self {
            Codec::Mp4 | Codec::Mp4H264 => Container::Mp4,
            Codec::WebmVp9 | Codec::WebmVp8 | Codec::Webm => Container::Webm,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Codec::Mp4 => "mp4",
            Codec::Mp4H264 => "mp4-h264",
            Codec::WebmVp9 => "webm-vp9",
            Codec::WebmVp8 => "webm-vp8",
            Codec::Webm => "webm",
        }
    }
}

impl Container {
    /// File extension for the output artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_bps: u64,
}

impl EncodeSettings {
    pub fn validate(&self) -> ScenecapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ScenecapError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // yuv420p output requires even dimensions.
            return Err(ScenecapError::validation(
                "encode width/height must be even",
            ));
        }
        if self.fps == 0 {
            return Err(ScenecapError::validation("encode fps must be non-zero"));
        }
        if self.bitrate_bps == 0 {
            return Err(ScenecapError::validation("encode bitrate must be non-zero"));
        }
        Ok(())
    }
}

/// A finished recording: the assembled blob plus the codec/container that
/// was actually negotiated, so the caller picks the right file extension.
#[derive(Clone, Debug)]
pub struct RecordedVideo {
    pub data: Vec<u8>,
    pub codec: Codec,
    pub container: Container,
}

/// The stateful, partially-unreliable external encoder, reduced to the
/// operations the adapter needs. Implementations must emit chunks in
/// encode order; `poll_chunks` after `stop` drains whatever remains.
pub trait EncoderBackend {
    fn supports(&self, codec: Codec) -> bool;
    fn start(&mut self, codec: Codec, settings: &EncodeSettings) -> ScenecapResult<()>;
    fn write_frame(&mut self, frame: &FrameRgba) -> ScenecapResult<()>;
    fn poll_chunks(&mut self) -> ScenecapResult<Vec<EncodedChunk>>;
    fn stop(&mut self) -> ScenecapResult<()>;
}

/// Drives one encoder backend for one session: negotiates a codec up
/// front, feeds composited frames, accumulates emitted chunks in order and
/// finalizes exactly once.
pub struct EncoderAdapter {
    backend: Box<dyn EncoderBackend>,
    codec: Codec,
    settings: Option<EncodeSettings>,
    chunks: Vec<EncodedChunk>,
    finalized: bool,
}

impl std::fmt::Debug for EncoderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderAdapter")
            .field("codec", &self.codec)
            .field("settings", &self.settings)
            .field("chunks", &self.chunks.len())
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl EncoderAdapter {
    /// Probe the backend for each candidate in priority order; the first
    /// supported codec wins.
    pub fn negotiate(
        backend: Box<dyn EncoderBackend>,
        candidates: &[Codec],
    ) -> ScenecapResult<Self> {
        let codec = candidates
            .iter()
            .copied()
            .find(|c| backend.supports(*c))
            .ok_or(ScenecapError::NoSupportedCodec)?;

        tracing::info!(
            codec = codec.label(),
            container = codec.container().extension(),
            "negotiated encoder codec"
        );

        Ok(Self {
            backend,
            codec,
            settings: None,
            chunks: Vec::new(),
            finalized: false,
        })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn container(&self) -> Container {
        self.codec.container()
    }

    pub fn start(&mut self, settings: EncodeSettings) -> ScenecapResult<()> {
        settings.validate()?;
        if self.settings.is_some() {
            return Err(ScenecapError::validation("encoder is already started"));
        }
        self.backend.start(self.codec, &settings)?;
        self.settings = Some(settings);
        Ok(())
    }

    /// Commit one composited frame. The frame is fully handed to the
    /// backend before this returns, so the stream's backing buffer always
    /// holds the correct frame at each virtual tick.
    pub fn write_frame(&mut self, frame: &FrameRgba) -> ScenecapResult<()> {
        let Some(settings) = &self.settings else {
            return Err(ScenecapError::validation("encoder was never started"));
        };
        if self.finalized {
            return Err(ScenecapError::validation("encoder is already finalized"));
        }
        if frame.width != settings.width || frame.height != settings.height {
            return Err(ScenecapError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, settings.width, settings.height
            )));
        }

        self.backend.write_frame(frame)?;
        self.chunks.extend(self.backend.poll_chunks()?);
        Ok(())
    }

    /// Stop and flush the backend. Idempotent and race-safe: both the
    /// natural end-of-capture path and an abort may call this; only the
    /// first call does the work.
    pub fn finalize(&mut self) -> ScenecapResult<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        if self.settings.is_some() {
            self.backend.stop()?;
            self.chunks.extend(self.backend.poll_chunks()?);
        }
        tracing::debug!(chunks = self.chunks.len(), "encoder finalized");
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Assemble the final blob, preserving chunk emission order. Fails with
    /// `NoDataRecorded` when the encoder never produced output.
    pub fn take_video(&mut self) -> ScenecapResult<RecordedVideo> {
        if !self.finalized {
            return Err(ScenecapError::validation(
                "encoder must be finalized before taking the video",
            ));
        }
        if self.chunks.iter().all(|c| c.is_empty()) {
            return Err(ScenecapError::NoDataRecorded);
        }

        let mut data = Vec::with_capacity(self.chunks.iter().map(Vec::len).sum());
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        Ok(RecordedVideo {
            data,
            codec: self.codec,
            container: self.codec.container(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted backend: supports a fixed codec set, emits one counter
    /// chunk per frame and a trailer on stop.
    struct StubBackend {
        supported: Vec<Codec>,
        started: Option<Codec>,
        stops: usize,
        pending: Vec<EncodedChunk>,
        frames: u64,
    }

    impl StubBackend {
        fn new(supported: Vec<Codec>) -> Self {
            Self {
                supported,
                started: None,
                stops: 0,
                pending: Vec::new(),
                frames: 0,
            }
        }
    }

    impl EncoderBackend for StubBackend {
        fn supports(&self, codec: Codec) -> bool {
            self.supported.contains(&codec)
        }

        fn start(&mut self, codec: Codec, settings: &EncodeSettings) -> ScenecapResult<()> {
            settings.validate()?;
            self.started = Some(codec);
            Ok(())
        }

        fn write_frame(&mut self, _frame: &FrameRgba) -> ScenecapResult<()> {
            self.pending.push(vec![self.frames as u8]);
            self.frames += 1;
            Ok(())
        }

        fn poll_chunks(&mut self) -> ScenecapResult<Vec<EncodedChunk>> {
            Ok(std::mem::take(&mut self.pending))
        }

        fn stop(&mut self) -> ScenecapResult<()> {
            self.stops += 1;
            self.pending.push(b"trailer".to_vec());
            Ok(())
        }
    }

    fn settings() -> EncodeSettings {
        EncodeSettings {
            width: 4,
            height: 4,
            fps: 30,
            bitrate_bps: 2_000_000,
        }
    }

    fn frame() -> FrameRgba {
        FrameRgba::filled(4, 4, crate::config::Rgb::BLACK)
    }

    #[test]
    fn negotiation_prefers_mp4() {
        let backend = StubBackend::new(Codec::CANDIDATES.to_vec());
        let adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        assert_eq!(adapter.codec(), Codec::Mp4);
        assert_eq!(adapter.container().extension(), "mp4");
    }

    #[test]
    fn negotiation_falls_back_to_vp8_and_reports_webm() {
        let backend = StubBackend::new(vec![Codec::WebmVp8]);
        let adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        assert_eq!(adapter.codec(), Codec::WebmVp8);
        assert_eq!(adapter.container().extension(), "webm");
    }

    #[test]
    fn negotiation_fails_with_nothing_supported() {
        let backend = StubBackend::new(vec![]);
        let err = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap_err();
        assert!(matches!(err, ScenecapError::NoSupportedCodec));
    }

    #[test]
    fn chunks_concatenate_in_emission_order() {
        let backend = StubBackend::new(vec![Codec::Mp4]);
        let mut adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        adapter.start(settings()).unwrap();
        for _ in 0..3 {
            adapter.write_frame(&frame()).unwrap();
        }
        adapter.finalize().unwrap();
        let video = adapter.take_video().unwrap();
        assert_eq!(&video.data[..3], &[0, 1, 2]);
        assert!(video.data.ends_with(b"trailer"));
        assert_eq!(video.container, Container::Mp4);
    }

    #[test]
    fn finalize_is_idempotent() {
        let backend = StubBackend::new(vec![Codec::Mp4]);
        let mut adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        adapter.start(settings()).unwrap();
        adapter.write_frame(&frame()).unwrap();
        adapter.finalize().unwrap();
        adapter.finalize().unwrap();
        adapter.finalize().unwrap();
        let video = adapter.take_video().unwrap();
        // One trailer only: stop ran exactly once.
        assert_eq!(
            video.data.windows(7).filter(|w| w == b"trailer").count(),
            1
        );
    }

    #[test]
    fn zero_chunks_is_no_data_recorded() {
        let backend = StubBackend::new(vec![Codec::WebmVp9]);
        let mut adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        adapter.finalize().unwrap();
        assert!(matches!(
            adapter.take_video().unwrap_err(),
            ScenecapError::NoDataRecorded
        ));
    }

    #[test]
    fn write_after_finalize_is_rejected() {
        let backend = StubBackend::new(vec![Codec::Mp4]);
        let mut adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        adapter.start(settings()).unwrap();
        adapter.finalize().unwrap();
        assert!(adapter.write_frame(&frame()).is_err());
    }

    #[test]
    fn frame_size_mismatch_is_rejected() {
        let backend = StubBackend::new(vec![Codec::Mp4]);
        let mut adapter = EncoderAdapter::negotiate(Box::new(backend), &Codec::CANDIDATES).unwrap();
        adapter.start(settings()).unwrap();
        let wrong = FrameRgba::filled(6, 4, crate::config::Rgb::BLACK);
        assert!(adapter.write_frame(&wrong).is_err());
    }

    #[test]
    fn odd_settings_are_rejected() {
        assert!(
            EncodeSettings {
                width: 5,
                ..settings()
            }
            .validate()
            .is_err()
        );
    }
}
