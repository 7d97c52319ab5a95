use crate::ease::Ease;

/// Declarative description of one time-driven element's motion: how long one
/// cycle lasts, how it eases, how often it repeats, which way it plays and
/// what it shows outside its active interval. This is the contract the seek
/// protocol interprets; it is deliberately independent of any styling
/// mechanism.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MotionSpec {
    pub duration_seconds: f64,
    pub ease: Ease,
    pub iterations: IterationCount,
    pub direction: Direction,
    pub fill: FillMode,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationCount {
    Finite(f64),
    Infinite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Normal,
    Reverse,
    Alternate,
    AlternateReverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    None,
    Forwards,
    Backwards,
    Both,
}

impl MotionSpec {
    /// A single forward cycle with linear easing, repeating forever. The
    /// shape most animated documents reduce to.
    pub fn looping(duration_seconds: f64) -> Self {
        Self {
            duration_seconds,
            ease: Ease::Linear,
            iterations: IterationCount::Infinite,
            direction: Direction::Normal,
            fill: FillMode::None,
        }
    }

    pub fn repeats_beyond_one_cycle(&self) -> bool {
        match self.iterations {
            IterationCount::Infinite => true,
            IterationCount::Finite(n) => n > 1.0,
        }
    }

    /// The negative start offset that makes this motion render exactly at
    /// `time_seconds`. Repeating motion wraps into its cycle so the offset
    /// stays bounded; single-shot motion is offset by the full time.
    pub fn seek_offset_seconds(&self, time_seconds: f64) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 0.0;
        }
        if self.repeats_beyond_one_cycle() {
            -(time_seconds % self.duration_seconds)
        } else {
            -time_seconds
        }
    }
}

/// Resolved visual state of a motion at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    /// Eased progress through the current cycle, in [0, 1].
    pub progress: f64,
    /// Zero-based cycle index.
    pub iteration: u64,
}

/// Pure interpreter: the state `spec` renders at `time_seconds`, or `None`
/// when the motion contributes nothing (outside its active interval and not
/// covered by the fill mode).
pub fn motion_state_at(spec: &MotionSpec, time_seconds: f64) -> Option<MotionState> {
    let iterations = match spec.iterations {
        IterationCount::Infinite => f64::INFINITY,
        IterationCount::Finite(n) => n.max(0.0),
    };

    if spec.duration_seconds <= 0.0 || iterations == 0.0 {
        return None;
    }

    if time_seconds < 0.0 {
        return match spec.fill {
            FillMode::Backwards | FillMode::Both => Some(state_at(spec, 0.0, iterations)),
            FillMode::None | FillMode::Forwards => None,
        };
    }

    let total = spec.duration_seconds * iterations;
    if time_seconds >= total {
        return match spec.fill {
            FillMode::Forwards | FillMode::Both => Some(state_at(spec, total, iterations)),
            FillMode::None | FillMode::Backwards => None,
        };
    }

    Some(state_at(spec, time_seconds, iterations))
}

fn state_at(spec: &MotionSpec, time_seconds: f64, iterations: f64) -> MotionState {
    let overall = (time_seconds / spec.duration_seconds).min(iterations);
    let mut iteration = overall.floor();
    let mut fraction = overall - iteration;
    // The exact end of the last whole cycle belongs to that cycle, not to a
    // phantom next one.
    if fraction == 0.0 && iteration > 0.0 && overall >= iterations {
        iteration -= 1.0;
        fraction = 1.0;
    }

    let idx = iteration as u64;
    let directed = match spec.direction {
        Direction::Normal => fraction,
        Direction::Reverse => 1.0 - fraction,
        Direction::Alternate => {
            if idx % 2 == 0 {
                fraction
            } else {
                1.0 - fraction
            }
        }
        Direction::AlternateReverse => {
            if idx % 2 == 0 {
                1.0 - fraction
            } else {
                fraction
            }
        }
    };

    MotionState {
        progress: spec.ease.apply(directed),
        iteration: idx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(duration: f64, iterations: IterationCount) -> MotionSpec {
        MotionSpec {
            duration_seconds: duration,
            ease: Ease::Linear,
            iterations,
            direction: Direction::Normal,
            fill: FillMode::None,
        }
    }

    #[test]
    fn infinite_motion_wraps_into_its_cycle() {
        let s = spec(2.0, IterationCount::Infinite);
        assert_eq!(s.seek_offset_seconds(5.0), -1.0);
        let a = motion_state_at(&s, 0.5).unwrap();
        let b = motion_state_at(&s, 4.5).unwrap();
        assert_eq!(a.progress, b.progress);
        assert_eq!(b.iteration, 2);
    }

    #[test]
    fn single_shot_motion_uses_full_time_offset() {
        let s = spec(2.0, IterationCount::Finite(1.0));
        assert_eq!(s.seek_offset_seconds(5.0), -5.0);
    }

    #[test]
    fn finite_motion_ends_without_fill() {
        let s = spec(1.0, IterationCount::Finite(2.0));
        assert!(motion_state_at(&s, 1.5).is_some());
        assert!(motion_state_at(&s, 2.0).is_none());
        assert!(motion_state_at(&s, -0.1).is_none());
    }

    #[test]
    fn fill_modes_hold_edge_states() {
        let mut s = spec(1.0, IterationCount::Finite(2.0));
        s.fill = FillMode::Both;
        let before = motion_state_at(&s, -1.0).unwrap();
        assert_eq!(before.progress, 0.0);
        let after = motion_state_at(&s, 10.0).unwrap();
        assert_eq!(after.progress, 1.0);
        assert_eq!(after.iteration, 1);
    }

    #[test]
    fn alternate_direction_reverses_odd_cycles() {
        let mut s = spec(1.0, IterationCount::Infinite);
        s.direction = Direction::Alternate;
        let even = motion_state_at(&s, 0.25).unwrap();
        let odd = motion_state_at(&s, 1.25).unwrap();
        assert_eq!(even.progress, 0.25);
        assert_eq!(odd.progress, 0.75);
    }

    #[test]
    fn reverse_direction_flips_progress() {
        let mut s = spec(1.0, IterationCount::Infinite);
        s.direction = Direction::Reverse;
        assert_eq!(motion_state_at(&s, 0.25).unwrap().progress, 0.75);
    }

    #[test]
    fn zero_duration_has_no_state() {
        let s = spec(0.0, IterationCount::Infinite);
        assert!(motion_state_at(&s, 1.0).is_none());
        assert_eq!(s.seek_offset_seconds(3.0), 0.0);
    }

    #[test]
    fn interpreter_is_deterministic() {
        let mut s = spec(1.7, IterationCount::Finite(3.5));
        s.ease = Ease::InOutCubic;
        s.direction = Direction::AlternateReverse;
        for i in 0..40 {
            let t = i as f64 * 0.2;
            assert_eq!(motion_state_at(&s, t), motion_state_at(&s, t));
        }
    }
}
