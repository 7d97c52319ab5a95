use crate::{
    error::ScenecapResult,
    surface::{MotionOffset, RenderSurface},
};

/// Force every time-driven element on the surface to render exactly as it
/// would at `time_seconds`, then settle layout and freeze motion so the
/// state cannot advance before the snapshot is taken.
///
/// The rewrite is expressed as negative start offsets: repeating motion is
/// wrapped into its cycle, single-shot motion is offset by the full time
/// (see [`MotionSpec::seek_offset_seconds`]). Calling this twice with the
/// same time yields the same visible state.
///
/// [`MotionSpec::seek_offset_seconds`]: crate::motion::MotionSpec::seek_offset_seconds
pub fn seek(surface: &mut dyn RenderSurface, time_seconds: f64) -> ScenecapResult<()> {
    let specs = surface.motion_specs()?;
    let offsets: Vec<MotionOffset> = specs
        .iter()
        .enumerate()
        .map(|(index, spec)| MotionOffset {
            index,
            offset_seconds: spec.seek_offset_seconds(time_seconds),
        })
        .collect();

    surface.retime(&offsets)?;
    surface.settle()?;
    surface.pause()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ScenecapError,
        motion::{IterationCount, MotionSpec},
        surface::{Dimensions, RawSnapshot, SelectorChain},
    };

    #[derive(Default)]
    struct RecordingSurface {
        specs: Vec<MotionSpec>,
        retimes: Vec<Vec<MotionOffset>>,
        settles: usize,
        pauses: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn ensure_ready(&mut self) -> ScenecapResult<()> {
            Ok(())
        }

        fn measure(&mut self, _selectors: &SelectorChain) -> ScenecapResult<Dimensions> {
            Ok(Dimensions {
                width: 4,
                height: 4,
            })
        }

        fn motion_specs(&self) -> ScenecapResult<Vec<MotionSpec>> {
            Ok(self.specs.clone())
        }

        fn retime(&mut self, offsets: &[MotionOffset]) -> ScenecapResult<()> {
            self.retimes.push(offsets.to_vec());
            Ok(())
        }

        fn settle(&mut self) -> ScenecapResult<()> {
            self.settles += 1;
            Ok(())
        }

        fn pause(&mut self) -> ScenecapResult<()> {
            self.pauses += 1;
            Ok(())
        }

        fn snapshot(&mut self) -> ScenecapResult<RawSnapshot> {
            Err(ScenecapError::validation("not used here"))
        }
    }

    #[test]
    fn seek_retimes_settles_then_pauses() {
        let mut surface = RecordingSurface {
            specs: vec![
                MotionSpec::looping(2.0),
                MotionSpec {
                    iterations: IterationCount::Finite(1.0),
                    ..MotionSpec::looping(2.0)
                },
            ],
            ..RecordingSurface::default()
        };

        seek(&mut surface, 5.0).unwrap();

        assert_eq!(surface.retimes.len(), 1);
        let offsets = &surface.retimes[0];
        // Looping element wraps into its 2s cycle; single-shot gets the full time.
        assert_eq!(offsets[0].offset_seconds, -1.0);
        assert_eq!(offsets[1].offset_seconds, -5.0);
        assert_eq!(surface.settles, 1);
        assert_eq!(surface.pauses, 1);
    }

    #[test]
    fn seek_is_idempotent() {
        let mut surface = RecordingSurface {
            specs: vec![MotionSpec::looping(3.0)],
            ..RecordingSurface::default()
        };

        seek(&mut surface, 1.25).unwrap();
        seek(&mut surface, 1.25).unwrap();

        assert_eq!(surface.retimes.len(), 2);
        assert_eq!(surface.retimes[0], surface.retimes[1]);
    }

    #[test]
    fn seek_with_no_motion_still_settles() {
        let mut surface = RecordingSurface::default();
        seek(&mut surface, 0.0).unwrap();
        assert_eq!(surface.retimes[0].len(), 0);
        assert_eq!(surface.settles, 1);
        assert_eq!(surface.pauses, 1);
    }
}
