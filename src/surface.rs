use crate::{
    error::{ScenecapError, ScenecapResult},
    motion::MotionSpec,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// The session's effective source geometry: the measured element bounds
/// rounded up to even integers, fixed for the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceGeometry {
    pub width: u32,
    pub height: u32,
}

impl SourceGeometry {
    pub fn from_measured(dims: Dimensions) -> Self {
        Self {
            width: round_up_even(dims.width),
            height: round_up_even(dims.height),
        }
    }
}

fn round_up_even(v: u32) -> u32 {
    let v = v.max(2);
    if v % 2 == 0 { v } else { v + 1 }
}

/// Raw raster grabbed from the surface: RGBA8, row-major, as actually
/// rendered (may differ from the configured target size).
#[derive(Clone, Debug)]
pub struct RawSnapshot {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawSnapshot {
    pub fn validate(&self) -> ScenecapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ScenecapError::validation("snapshot has zero dimensions"));
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(ScenecapError::validation(format!(
                "snapshot buffer is {} bytes, expected {} for {}x{} rgba8",
                self.data.len(),
                expected,
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Element lookup order when measuring the capture target: the primary
/// selector, then a generic drawing surface, then the whole document.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SelectorChain {
    pub selectors: Vec<String>,
}

impl Default for SelectorChain {
    fn default() -> Self {
        Self {
            selectors: vec![
                ".scene".to_string(),
                "canvas".to_string(),
                "body".to_string(),
            ],
        }
    }
}

impl SelectorChain {
    pub fn primary(selector: impl Into<String>) -> Self {
        let mut chain = Self::default();
        chain.selectors.insert(0, selector.into());
        chain
    }
}

/// Start-offset rewrite for one time-driven element, keyed by its position
/// in the surface's `motion_specs()` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionOffset {
    pub index: usize,
    pub offset_seconds: f64,
}

/// The external collaborator that actually renders the document. The core
/// never touches its internals; it only measures, retimes, settles, pauses
/// and snapshots through this contract. Single-writer: during an active
/// session only the seek protocol mutates the surface's time state.
pub trait RenderSurface {
    /// Block until the initial document load has completed. Must be awaited
    /// once per session before the first seek.
    fn ensure_ready(&mut self) -> ScenecapResult<()>;

    /// Measured bounds of the first element the selector chain resolves.
    fn measure(&mut self, selectors: &SelectorChain) -> ScenecapResult<Dimensions>;

    /// Motion descriptions of every time-driven element, in a stable order.
    fn motion_specs(&self) -> ScenecapResult<Vec<MotionSpec>>;

    /// Reapply each element's motion with the given start offsets so the
    /// surface renders at the requested instant.
    fn retime(&mut self, offsets: &[MotionOffset]) -> ScenecapResult<()>;

    /// Force a layout/paint settle after a retime.
    fn settle(&mut self) -> ScenecapResult<()>;

    /// Freeze all motion so it cannot advance past the sampled instant.
    fn pause(&mut self) -> ScenecapResult<()>;

    fn snapshot(&mut self) -> ScenecapResult<RawSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_rounds_up_to_even() {
        let g = SourceGeometry::from_measured(Dimensions {
            width: 601,
            height: 600,
        });
        assert_eq!((g.width, g.height), (602, 600));

        let tiny = SourceGeometry::from_measured(Dimensions {
            width: 1,
            height: 0,
        });
        assert_eq!((tiny.width, tiny.height), (2, 2));
    }

    #[test]
    fn snapshot_buffer_length_is_checked() {
        let ok = RawSnapshot {
            width: 2,
            height: 2,
            data: vec![0; 16],
        };
        ok.validate().unwrap();

        let bad = RawSnapshot {
            width: 2,
            height: 2,
            data: vec![0; 15],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn default_chain_falls_back_to_body() {
        let chain = SelectorChain::default();
        assert_eq!(chain.selectors.last().unwrap(), "body");
        let custom = SelectorChain::primary("#stage");
        assert_eq!(custom.selectors.first().unwrap(), "#stage");
        assert_eq!(custom.selectors.len(), 4);
    }
}
