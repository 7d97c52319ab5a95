use crate::config::CaptureConfig;

/// Frames in one loop iteration. Floors to match the virtual timeline and
/// never drops below 1 so a zero-duration animation still yields frames.
pub fn frames_per_loop(config: &CaptureConfig) -> u64 {
    let frames = (config.duration_seconds * f64::from(config.fps)) / config.playback_speed;
    (frames.floor() as u64).max(1)
}

pub fn total_frames(config: &CaptureConfig) -> u64 {
    frames_per_loop(config) * u64::from(config.loop_count.max(1))
}

/// Virtual animation time represented by `frame_index`, independent of how
/// long real capture takes. Wraps modulo the duration so every loop
/// iteration replays identical in-loop times.
pub fn sample_time(frame_index: u64, config: &CaptureConfig) -> f64 {
    let elapsed = (frame_index as f64 / f64::from(config.fps)) * config.playback_speed;
    if config.duration_seconds > 0.0 {
        elapsed % config.duration_seconds
    } else {
        0.0
    }
}
