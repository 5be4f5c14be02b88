//! Interpolation timing configuration and seconds to frame conversion.

use std::ops::RangeInclusive;

// -------------------------------------------------------------------------------------------------

/// Converts a duration in seconds into a duration in transform frames.
///
/// One spectral frame spans `transform_size` samples, so this is the number of
/// frames that cover the given wall-clock time at the given sample rate.
fn seconds_to_frames(seconds: f32, sample_rate: u32, transform_size: usize) -> u32 {
    (seconds * sample_rate as f32 / transform_size as f32).round() as u32
}

// -------------------------------------------------------------------------------------------------

/// Interpolation timing configuration: base leg length and random variance bound in
/// seconds, with the min/max leg durations derived in transform frames.
///
/// Updated bounds only affect durations drawn after the change. Legs that are
/// already running keep the duration they drew and pick up the new bounds when
/// they complete and acquire their next target.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTiming {
    length_secs: f32,
    variance_secs: f32,
    sample_rate: u32,
    transform_size: usize,
    length_frames: u32,
    variance_frames: u32,
    min_frames: u32,
    max_frames: u32,
}

impl InterpolationTiming {
    /// Valid range of the base interpolation length in seconds.
    pub const LENGTH_RANGE: RangeInclusive<f32> = 0.0..=30.0;
    /// Valid range of the random variance bound in seconds.
    pub const VARIANCE_RANGE: RangeInclusive<f32> = 0.0..=15.0;

    /// Shortest allowed leg duration in frames. Keeps increment divisions safe.
    pub const MIN_LEG_FRAMES: u32 = 1;

    pub fn new(
        length_secs: f32,
        variance_secs: f32,
        sample_rate: u32,
        transform_size: usize,
    ) -> Self {
        assert!(sample_rate > 0, "Invalid sample rate");
        assert!(transform_size > 0, "Invalid transform size");

        let mut timing = Self {
            length_secs: 0.0,
            variance_secs: 0.0,
            sample_rate,
            transform_size,
            length_frames: Self::MIN_LEG_FRAMES,
            variance_frames: 0,
            min_frames: Self::MIN_LEG_FRAMES,
            max_frames: Self::MIN_LEG_FRAMES,
        };
        timing.set_timing(length_secs, variance_secs);
        timing
    }

    /// Set the base interpolation length and variance in seconds, clamped into
    /// their valid ranges, and re-derive the min/max leg durations.
    ///
    /// Safe to call from a control context at any time. This never touches
    /// per-bin state.
    pub fn set_timing(&mut self, length_secs: f32, variance_secs: f32) {
        self.length_secs = length_secs.clamp(*Self::LENGTH_RANGE.start(), *Self::LENGTH_RANGE.end());
        self.variance_secs =
            variance_secs.clamp(*Self::VARIANCE_RANGE.start(), *Self::VARIANCE_RANGE.end());
        self.update_frame_bounds();
    }

    /// Update the sample rate after the host reported a playback rate change and
    /// re-derive the frame bounds. Invalid rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 {
            log::warn!("Ignoring invalid sample rate: {sample_rate}");
            return;
        }
        self.sample_rate = sample_rate;
        self.update_frame_bounds();
    }

    /// Base interpolation length in seconds.
    pub fn length_secs(&self) -> f32 {
        self.length_secs
    }

    /// Random variance bound in seconds.
    pub fn variance_secs(&self) -> f32 {
        self.variance_secs
    }

    /// The active playback sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The bin count of the enclosing transform, fixed at construction.
    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    /// Base interpolation length in frames, always at least one frame.
    pub fn length_frames(&self) -> u32 {
        self.length_frames
    }

    /// Random variance bound in frames.
    pub fn variance_frames(&self) -> u32 {
        self.variance_frames
    }

    /// Shortest drawable leg duration in frames.
    #[inline(always)]
    pub fn min_frames(&self) -> u32 {
        self.min_frames
    }

    /// Longest drawable leg duration in frames.
    #[inline(always)]
    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    fn update_frame_bounds(&mut self) {
        self.length_frames =
            seconds_to_frames(self.length_secs, self.sample_rate, self.transform_size)
                .max(Self::MIN_LEG_FRAMES);
        self.variance_frames =
            seconds_to_frames(self.variance_secs, self.sample_rate, self.transform_size);
        self.min_frames = self
            .length_frames
            .saturating_sub(self.variance_frames)
            .max(Self::MIN_LEG_FRAMES);
        self.max_frames = self.length_frames + self.variance_frames;
    }
}

// -------------------------------------------------------------------------------------------------
