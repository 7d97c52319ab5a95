use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    error::{ScenecapError, ScenecapResult},
    motion::MotionSpec,
    surface::{Dimensions, MotionOffset, RawSnapshot, RenderSurface, SelectorChain},
};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// A [`RenderSurface`] backed by a numbered image sequence on disk: file N
/// is the scene as rendered at `N / sequence_fps` seconds, looping. This is
/// the offline surface the CLI captures from; live document surfaces plug
/// in through the same trait.
pub struct SequenceSurface {
    frames: Vec<PathBuf>,
    sequence_fps: f64,
    current_time: f64,
    dimensions: Option<Dimensions>,
    cached: Option<(usize, RawSnapshot)>,
}

impl SequenceSurface {
    /// Scan `dir` for image files, ordered by file name.
    pub fn open(dir: &Path, sequence_fps: f64) -> ScenecapResult<Self> {
        if !sequence_fps.is_finite() || sequence_fps <= 0.0 {
            return Err(ScenecapError::validation("sequence fps must be > 0"));
        }

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read sequence directory '{}'", dir.display()))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(ScenecapError::validation(format!(
                "no image frames found in '{}'",
                dir.display()
            )));
        }

        Ok(Self {
            frames,
            sequence_fps,
            current_time: 0.0,
            dimensions: None,
            cached: None,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames.len() as f64 / self.sequence_fps
    }

    fn frame_index_at(&self, time_seconds: f64) -> usize {
        let idx = (time_seconds.max(0.0) * self.sequence_fps).floor() as usize;
        idx % self.frames.len()
    }

    fn decode(&self, index: usize) -> ScenecapResult<RawSnapshot> {
        let path = &self.frames[index];
        let img = image::open(path)
            .with_context(|| format!("decode sequence frame '{}'", path.display()))?
            .to_rgba8();
        Ok(RawSnapshot {
            width: img.width(),
            height: img.height(),
            data: img.into_raw(),
        })
    }
}

impl RenderSurface for SequenceSurface {
    fn ensure_ready(&mut self) -> ScenecapResult<()> {
        if self.dimensions.is_none() {
            let first = self.decode(0).map_err(|e| {
                ScenecapError::surface_not_ready(format!("first sequence frame unreadable: {e}"))
            })?;
            self.dimensions = Some(Dimensions {
                width: first.width,
                height: first.height,
            });
            self.cached = Some((0, first));
        }
        Ok(())
    }

    fn measure(&mut self, _selectors: &SelectorChain) -> ScenecapResult<Dimensions> {
        self.ensure_ready()?;
        Ok(self.dimensions.expect("set by ensure_ready"))
    }

    fn motion_specs(&self) -> ScenecapResult<Vec<MotionSpec>> {
        Ok(vec![MotionSpec::looping(self.duration_seconds())])
    }

    fn retime(&mut self, offsets: &[MotionOffset]) -> ScenecapResult<()> {
        // One looping motion drives the whole sequence; its negative start
        // offset is exactly the wrapped sample time.
        if let Some(offset) = offsets.first() {
            self.current_time = -offset.offset_seconds;
        }
        Ok(())
    }

    fn settle(&mut self) -> ScenecapResult<()> {
        Ok(())
    }

    fn pause(&mut self) -> ScenecapResult<()> {
        // Nothing advances on its own; the sequence is frozen by nature.
        Ok(())
    }

    fn snapshot(&mut self) -> ScenecapResult<RawSnapshot> {
        let index = self.frame_index_at(self.current_time);
        if let Some((cached_index, snap)) = &self.cached {
            if *cached_index == index {
                return Ok(snap.clone());
            }
        }
        let snap = self.decode(index)?;
        self.cached = Some((index, snap.clone()));
        Ok(snap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sequence(dir: &Path, count: u32) {
        std::fs::create_dir_all(dir).unwrap();
        for i in 0..count {
            let mut img = image::RgbaImage::new(4, 4);
            for px in img.pixels_mut() {
                *px = image::Rgba([i as u8 * 10, 0, 0, 255]);
            }
            img.save(dir.join(format!("frame_{i:04}.png"))).unwrap();
        }
    }

    #[test]
    fn open_rejects_empty_directories() {
        let dir = PathBuf::from("target").join("seq_empty");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(SequenceSurface::open(&dir, 10.0).is_err());
    }

    #[test]
    fn frames_map_to_times_and_loop() {
        let dir = PathBuf::from("target").join("seq_basic");
        write_sequence(&dir, 3);
        let mut surface = SequenceSurface::open(&dir, 1.0).unwrap();
        assert_eq!(surface.frame_count(), 3);
        assert_eq!(surface.duration_seconds(), 3.0);

        surface.ensure_ready().unwrap();
        let dims = surface.measure(&SelectorChain::default()).unwrap();
        assert_eq!((dims.width, dims.height), (4, 4));

        // Seek to 1.0s: second frame.
        crate::seek::seek(&mut surface, 1.0).unwrap();
        let snap = surface.snapshot().unwrap();
        assert_eq!(snap.data[0], 10);

        // Seek past the end wraps via the looping motion spec.
        crate::seek::seek(&mut surface, 4.0).unwrap();
        let snap = surface.snapshot().unwrap();
        assert_eq!(snap.data[0], 10);
    }

    #[test]
    fn seeking_is_idempotent() {
        let dir = PathBuf::from("target").join("seq_idem");
        write_sequence(&dir, 2);
        let mut surface = SequenceSurface::open(&dir, 2.0).unwrap();
        surface.ensure_ready().unwrap();

        crate::seek::seek(&mut surface, 0.5).unwrap();
        let a = surface.snapshot().unwrap();
        crate::seek::seek(&mut surface, 0.5).unwrap();
        let b = surface.snapshot().unwrap();
        assert_eq!(a.data, b.data);
    }
}
