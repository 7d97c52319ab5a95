#![forbid(unsafe_code)]

pub mod color;
pub mod compositor;
pub mod config;
pub mod ease;
pub mod encoder;
pub mod encoder_ffmpeg;
pub mod error;
pub mod motion;
pub mod sampler;
pub mod scan;
pub mod seek;
pub mod sequence;
pub mod session;
pub mod surface;

pub use compositor::{FrameLayout, FrameRgba, composite};
pub use config::{CaptureConfig, ColorScheme, FilterValues, Rgb};
pub use ease::Ease;
pub use encoder::{
    Codec, Container, EncodeSettings, EncodedChunk, EncoderAdapter, EncoderBackend, RecordedVideo,
};
pub use encoder_ffmpeg::FfmpegEncoder;
pub use error::{ScenecapError, ScenecapResult};
pub use motion::{Direction, FillMode, IterationCount, MotionSpec, MotionState, motion_state_at};
pub use sampler::{frames_per_loop, sample_time, total_frames};
pub use seek::seek;
pub use sequence::SequenceSurface;
pub use session::{AbortHandle, CaptureSession, SessionOutcome, SessionState, SessionTuning};
pub use surface::{Dimensions, MotionOffset, RawSnapshot, RenderSurface, SelectorChain,
    SourceGeometry};
