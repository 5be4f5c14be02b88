//! Per-bin interpolation state, target acquisition and the randomized duration draw.

use rand::Rng;

use super::timing::InterpolationTiming;

// -------------------------------------------------------------------------------------------------

/// Draw a random leg duration in frames from the given inclusive bounds.
///
/// A collapsed range (`min >= max`) is a valid fixed duration and always returns
/// `min`. Deterministic for a given generator state.
pub(crate) fn draw_duration(min_frames: u32, max_frames: u32, rng: &mut impl Rng) -> u32 {
    debug_assert!(min_frames >= 1, "Leg durations must be at least one frame");
    if min_frames >= max_frames {
        min_frames
    } else {
        rng.random_range(min_frames..=max_frames)
    }
}

// -------------------------------------------------------------------------------------------------

/// Interpolation state of a single frequency bin.
///
/// `current` is the last emitted output value, moving towards `target` by
/// `increment` once per frame over a leg of `total_frames`. A bin whose leg has
/// completed is flagged via `needs_new_target`: its increments are stale and are
/// not applied again until a fresh target has been captured.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinState {
    pub(crate) current_magnitude: f32,
    pub(crate) current_phase: f32,
    pub(crate) target_magnitude: f32,
    pub(crate) target_phase: f32,
    pub(crate) increment_magnitude: f32,
    pub(crate) increment_phase: f32,
    pub(crate) total_frames: u32,
    pub(crate) frame_count: u32,
    pub(crate) needs_new_target: bool,
}

impl BinState {
    /// The last emitted magnitude/real value.
    #[inline(always)]
    pub fn current_magnitude(&self) -> f32 {
        self.current_magnitude
    }

    /// The last emitted phase/imaginary value.
    #[inline(always)]
    pub fn current_phase(&self) -> f32 {
        self.current_phase
    }

    /// The magnitude value the bin is interpolating towards.
    #[inline(always)]
    pub fn target_magnitude(&self) -> f32 {
        self.target_magnitude
    }

    /// The phase value the bin is interpolating towards.
    #[inline(always)]
    pub fn target_phase(&self) -> f32 {
        self.target_phase
    }

    /// Per-frame magnitude delta of the running leg.
    #[inline(always)]
    pub fn increment_magnitude(&self) -> f32 {
        self.increment_magnitude
    }

    /// Per-frame phase delta of the running leg.
    #[inline(always)]
    pub fn increment_phase(&self) -> f32 {
        self.increment_phase
    }

    /// The randomly drawn duration of the running leg in frames.
    #[inline(always)]
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Frames elapsed since the running leg began.
    #[inline(always)]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// True when the leg has completed and a fresh target must be captured from
    /// the next observed input.
    #[inline(always)]
    pub fn needs_new_target(&self) -> bool {
        self.needs_new_target
    }
}

// -------------------------------------------------------------------------------------------------

/// Preallocated table of per-bin interpolation state, one entry per frequency bin.
///
/// Owned and mutated exclusively by the engine's real-time perform loop. All
/// storage is allocated up front and lives for the lifetime of the engine, so
/// nothing on the audio path allocates.
#[derive(Debug)]
pub struct BinStateTable {
    bins: Box<[BinState]>,
}

impl BinStateTable {
    /// Create a zero-initialized table with all bins flagged for target capture,
    /// so the very first processed block picks up live input instead of
    /// interpolating from silence.
    pub fn new(transform_size: usize) -> Self {
        debug_assert!(transform_size > 0, "Invalid transform size");
        let mut table = Self {
            bins: vec![BinState::default(); transform_size].into_boxed_slice(),
        };
        table.mark_all_stale();
        table
    }

    /// Number of bins in the table.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Read access to a single bin's state.
    #[inline(always)]
    pub fn bin(&self, bin: usize) -> &BinState {
        &self.bins[bin]
    }

    /// Resolve a bin index signal value into a valid table index.
    ///
    /// Out-of-range values are clamped to the nearest valid bin instead of being
    /// rejected, and NaN resolves to bin 0, so a malformed index stream can never
    /// cause an out-of-bounds access or abort audio.
    #[inline(always)]
    pub fn resolve_bin(&self, index: f32) -> usize {
        (index as i64).clamp(0, self.bins.len() as i64 - 1) as usize
    }

    /// Flag every bin to capture a fresh target from the next observed input.
    pub fn mark_all_stale(&mut self) {
        for state in self.bins.iter_mut() {
            state.needs_new_target = true;
        }
    }

    /// Make the previous leg's end point the new interpolation baseline.
    ///
    /// Together with [`Self::acquire_new_target`] this guarantees continuity: the
    /// new leg starts exactly where the old one ended.
    #[inline(always)]
    pub fn carry_target_forward(&mut self, bin: usize) {
        let state = &mut self.bins[bin];
        state.current_magnitude = state.target_magnitude;
        state.current_phase = state.target_phase;
    }

    /// Capture a newly observed (magnitude, phase) snapshot as the bin's next
    /// interpolation target and draw a fresh randomized leg duration.
    ///
    /// Leaves the bin in a consistent state for stepping: the increments derive
    /// from the current value, the frame counter is reset and the stale flag is
    /// cleared. Out-of-range `bin` values are clamped into the table.
    pub fn acquire_new_target(
        &mut self,
        bin: usize,
        magnitude: f32,
        phase: f32,
        timing: &InterpolationTiming,
        rng: &mut impl Rng,
    ) {
        let bin = bin.min(self.bins.len() - 1);
        let state = &mut self.bins[bin];

        state.target_magnitude = magnitude;
        state.target_phase = phase;

        // The drawn duration is always >= 1, so the divisions are safe.
        state.total_frames = draw_duration(timing.min_frames(), timing.max_frames(), rng);
        state.increment_magnitude =
            (magnitude - state.current_magnitude) / state.total_frames as f32;
        state.increment_phase = (phase - state.current_phase) / state.total_frames as f32;

        state.frame_count = 0;
        state.needs_new_target = false;
    }

    /// Advance the bin's interpolation by one frame and return the updated
    /// (magnitude, phase) pair.
    ///
    /// Bins whose leg completed earlier in the block hold their last emitted value
    /// until the next refresh pass captures a new target.
    #[inline(always)]
    pub fn step(&mut self, bin: usize) -> (f32, f32) {
        let state = &mut self.bins[bin];
        if !state.needs_new_target {
            state.current_magnitude += state.increment_magnitude;
            state.current_phase += state.increment_phase;

            state.frame_count += 1;
            if state.frame_count >= state.total_frames {
                state.needs_new_target = true;
                state.frame_count = 0;
            }
        }
        (state.current_magnitude, state.current_phase)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    #[test]
    fn draws_durations_within_inclusive_bounds() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1000 {
            let frames = draw_duration(3, 9, &mut rng);
            assert!((3..=9).contains(&frames));
        }

        // collapsed ranges are valid fixed durations
        assert_eq!(draw_duration(5, 5, &mut rng), 5);
        assert_eq!(draw_duration(5, 3, &mut rng), 5);
    }

    #[test]
    fn new_table_is_zeroed_and_stale() {
        let table = BinStateTable::new(8);
        assert_eq!(table.len(), 8);
        for bin in 0..table.len() {
            let state = table.bin(bin);
            assert!(state.needs_new_target());
            assert_eq!(state.current_magnitude(), 0.0);
            assert_eq!(state.current_phase(), 0.0);
            assert_eq!(state.target_magnitude(), 0.0);
            assert_eq!(state.frame_count(), 0);
        }
    }

    #[test]
    fn resolves_any_index_into_the_table() {
        let table = BinStateTable::new(16);
        assert_eq!(table.resolve_bin(0.0), 0);
        assert_eq!(table.resolve_bin(7.9), 7);
        assert_eq!(table.resolve_bin(15.0), 15);
        assert_eq!(table.resolve_bin(-3.0), 0);
        assert_eq!(table.resolve_bin(100.0), 15);
        assert_eq!(table.resolve_bin(f32::INFINITY), 15);
        assert_eq!(table.resolve_bin(f32::NEG_INFINITY), 0);
        assert_eq!(table.resolve_bin(f32::NAN), 0);
    }

    #[test]
    fn acquiring_a_target_leaves_consistent_state() {
        let timing = InterpolationTiming::new(10.0, 0.0, 44100, 2048);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut table = BinStateTable::new(4);

        table.acquire_new_target(1, 2.0, 0.5, &timing, &mut rng);

        let state = table.bin(1);
        assert!(!state.needs_new_target());
        assert_eq!(state.frame_count(), 0);
        assert_eq!(state.total_frames(), 215);
        assert_eq!(state.target_magnitude(), 2.0);
        assert_eq!(state.target_phase(), 0.5);
        assert_relative_eq!(state.increment_magnitude(), 2.0 / 215.0);
        assert_relative_eq!(state.increment_phase(), 0.5 / 215.0);
    }

    #[test]
    fn acquiring_clamps_the_bin_index() {
        let timing = InterpolationTiming::new(10.0, 0.0, 44100, 2048);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut table = BinStateTable::new(4);

        table.acquire_new_target(100, 1.0, 0.0, &timing, &mut rng);
        assert!(!table.bin(3).needs_new_target());
        assert_eq!(table.bin(3).target_magnitude(), 1.0);
    }

    #[test]
    fn stepping_approaches_the_target_linearly() {
        let timing = InterpolationTiming::new(10.0, 0.0, 44100, 2048);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut table = BinStateTable::new(1);

        table.acquire_new_target(0, 1.0, -1.0, &timing, &mut rng);
        let increment = table.bin(0).increment_magnitude();

        for k in 1..=215u32 {
            let (magnitude, phase) = table.step(0);
            assert_relative_eq!(magnitude, k as f32 * increment, epsilon = 1e-4);
            assert_relative_eq!(phase, -(k as f32) / 215.0, epsilon = 1e-4);
        }
        assert_relative_eq!(table.bin(0).current_magnitude(), 1.0, epsilon = 1e-4);
        assert!(table.bin(0).needs_new_target());
        assert_eq!(table.bin(0).frame_count(), 0);
    }

    #[test]
    fn stale_bins_hold_their_value() {
        let mut table = BinStateTable::new(1);

        // freshly constructed bins are stale and must not move
        let (magnitude, phase) = table.step(0);
        assert_eq!(magnitude, 0.0);
        assert_eq!(phase, 0.0);
        assert_eq!(table.bin(0).frame_count(), 0);
        assert!(table.bin(0).needs_new_target());
    }
}
