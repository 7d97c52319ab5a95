pub type ScenecapResult<T> = Result<T, ScenecapError>;

#[derive(thiserror::Error, Debug)]
pub enum ScenecapError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("render surface is not ready: {0}")]
    SurfaceNotReady(String),

    #[error("encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("no supported codec among the offered candidates")]
    NoSupportedCodec,

    #[error("frame {frame} capture failed: {source}")]
    FrameCapture {
        frame: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("encoder emitted no data")]
    NoDataRecorded,

    #[error("encoder finalize failed: {0}")]
    FinalizeFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScenecapError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn surface_not_ready(msg: impl Into<String>) -> Self {
        Self::SurfaceNotReady(msg.into())
    }

    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable(msg.into())
    }

    pub fn finalize_failed(msg: impl Into<String>) -> Self {
        Self::FinalizeFailed(msg.into())
    }

    pub fn frame_capture(frame: u64, source: impl Into<anyhow::Error>) -> Self {
        Self::FrameCapture {
            frame,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ScenecapError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ScenecapError::encoder_unavailable("x")
                .to_string()
                .contains("encoder unavailable:")
        );
        assert!(
            ScenecapError::finalize_failed("x")
                .to_string()
                .contains("finalize failed:")
        );
    }

    #[test]
    fn frame_capture_reports_index_and_cause() {
        let err = ScenecapError::frame_capture(7, std::io::Error::other("boom"));
        let s = err.to_string();
        assert!(s.contains("frame 7"));
        assert!(s.contains("boom"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ScenecapError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
