//! Real-time per-bin spectral interpolation engine.

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use four_cc::FourCC;
use rand::{rngs::SmallRng, SeedableRng};

use crate::{error::Error, parameter::FloatParameter};

use self::{bins::BinStateTable, timing::InterpolationTiming};

pub mod bins;
pub mod timing;

// -------------------------------------------------------------------------------------------------

/// Transform size (bin count) used when the host provides no frequency-domain context.
pub const DEFAULT_TRANSFORM_SIZE: usize = 4096;

// -------------------------------------------------------------------------------------------------

/// Control messages for a [`BinInterpolator`], applied in the engine's real-time
/// thread at the start of the next processed block.
#[derive(Debug, Clone, Copy)]
pub enum InterpolatorMessage {
    /// Set the base interpolation length and variance in seconds. Values are
    /// clamped into the `LENGTH`/`VARIANCE` parameter ranges.
    SetTiming {
        length_secs: f32,
        variance_secs: f32,
    },
    /// Update a single parameter, addressed by its FourCC id.
    SetParameter { id: FourCC, value: f32 },
}

// -------------------------------------------------------------------------------------------------

/// Cloneable handle for feeding control messages to a [`BinInterpolator`] from
/// non-audio threads.
///
/// Messages are buffered in a bounded lock-free queue and picked up at the start
/// of the next processed block, so an update may race with an in-progress block:
/// the effect is bounded to "the next drawn duration may use the old or the new
/// range", never torn per-sample output.
#[derive(Debug, Clone)]
pub struct InterpolatorHandle {
    message_queue: Arc<ArrayQueue<InterpolatorMessage>>,
}

impl InterpolatorHandle {
    /// Schedule a new base interpolation length and variance in seconds.
    pub fn set_interpolation_timing(
        &self,
        length_secs: f32,
        variance_secs: f32,
    ) -> Result<(), Error> {
        self.send(InterpolatorMessage::SetTiming {
            length_secs,
            variance_secs,
        })
    }

    /// Schedule an update of a single parameter value.
    ///
    /// Unknown parameter ids are rejected here, on the control side, so the
    /// audio thread never has to deal with them.
    pub fn set_parameter(&self, id: FourCC, value: f32) -> Result<(), Error> {
        if id != BinInterpolator::LENGTH.id() && id != BinInterpolator::VARIANCE.id() {
            return Err(Error::ParameterError(format!("Unknown parameter: '{id}'")));
        }
        self.send(InterpolatorMessage::SetParameter { id, value })
    }

    fn send(&self, message: InterpolatorMessage) -> Result<(), Error> {
        self.message_queue
            .push(message)
            .map_err(|_| Error::SendError("Control message queue is full".to_string()))
    }
}

// -------------------------------------------------------------------------------------------------

/// Real-time per-bin interpolation engine for frequency-domain signals.
///
/// Once per audio block the host feeds three equal-length streams - magnitude/real,
/// phase/imaginary and bin index - and receives smoothly interpolated magnitude and
/// phase streams back. Each bin independently ramps from one observed spectral
/// snapshot to the next over a randomly drawn duration, which decorrelates
/// transition boundaries across the spectrum.
///
/// NB: [`Self::process`] is meant to be called from a real-time audio thread and
/// never blocks, allocates or logs. All other functions are control-path only.
pub struct BinInterpolator {
    timing: InterpolationTiming,
    bins: BinStateTable,
    rng: SmallRng,
    message_queue: Arc<ArrayQueue<InterpolatorMessage>>,
}

impl BinInterpolator {
    /// Base interpolation length parameter, in seconds.
    pub const LENGTH: FloatParameter = FloatParameter::new(
        FourCC(*b"ilen"),
        "Length",
        InterpolationTiming::LENGTH_RANGE,
        Self::DEFAULT_LENGTH_SECS,
    )
    .with_unit("s");

    /// Random variance bound parameter, in seconds.
    pub const VARIANCE: FloatParameter = FloatParameter::new(
        FourCC(*b"ivar"),
        "Variance",
        InterpolationTiming::VARIANCE_RANGE,
        Self::DEFAULT_VARIANCE_SECS,
    )
    .with_unit("s");

    const DEFAULT_LENGTH_SECS: f32 = 10.0;
    const DEFAULT_VARIANCE_SECS: f32 = 2.0;

    const MESSAGE_QUEUE_CAPACITY: usize = 128;

    /// Create a new engine for the given bin count and sample rate with default
    /// timing (10 s length, 2 s variance).
    ///
    /// `transform_size` is resolved once by the host from its enclosing
    /// frequency-domain context; hosts without one should pass
    /// [`DEFAULT_TRANSFORM_SIZE`]. All per-bin state is preallocated here for the
    /// lifetime of the engine; there is no partially constructed fallback.
    pub fn new(transform_size: usize, sample_rate: u32) -> Result<Self, Error> {
        if transform_size == 0 {
            return Err(Error::InvalidTransformSize(transform_size));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }

        log::debug!("Creating bin interpolator with {transform_size} bins at {sample_rate} Hz");

        Ok(Self {
            timing: InterpolationTiming::new(
                Self::DEFAULT_LENGTH_SECS,
                Self::DEFAULT_VARIANCE_SECS,
                sample_rate,
                transform_size,
            ),
            bins: BinStateTable::new(transform_size),
            rng: SmallRng::from_os_rng(),
            message_queue: Arc::new(ArrayQueue::new(Self::MESSAGE_QUEUE_CAPACITY)),
        })
    }

    /// Set an initial interpolation length and variance in seconds, clamped into
    /// their valid ranges.
    pub fn with_timing(mut self, length_secs: f32, variance_secs: f32) -> Self {
        self.timing.set_timing(length_secs, variance_secs);
        self
    }

    /// Replace the engine's random number generator, e.g. with a seeded one for
    /// deterministic duration draws in tests.
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    /// The engine's timing configuration.
    pub fn timing(&self) -> &InterpolationTiming {
        &self.timing
    }

    /// Read access to the engine's per-bin state.
    pub fn bins(&self) -> &BinStateTable {
        &self.bins
    }

    /// The engine's parameter descriptors, for generic control surfaces.
    pub fn parameters(&self) -> [&'static FloatParameter; 2] {
        [&Self::LENGTH, &Self::VARIANCE]
    }

    /// Create a control handle for sending messages from non-audio threads.
    pub fn handle(&self) -> InterpolatorHandle {
        InterpolatorHandle {
            message_queue: Arc::clone(&self.message_queue),
        }
    }

    /// Set the base interpolation length and variance in seconds, clamped into
    /// their documented ranges.
    ///
    /// Legs that are already running keep the duration they drew; the new bounds
    /// apply to all durations drawn afterwards.
    pub fn set_interpolation_timing(&mut self, length_secs: f32, variance_secs: f32) {
        self.timing.set_timing(length_secs, variance_secs);
    }

    /// Update the playback sample rate after the host reported a rate change.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.timing.set_sample_rate(sample_rate);
    }

    /// Flag all bins to capture fresh targets from the next processed block, e.g.
    /// when the host (re)starts its signal chain. Current output values are kept,
    /// so resuming does not glitch.
    pub fn reset(&mut self) {
        self.bins.mark_all_stale();
    }

    /// Handle a single parameter update, addressed by FourCC id.
    pub fn process_parameter_update(&mut self, id: FourCC, value: f32) -> Result<(), Error> {
        match id {
            _ if id == Self::LENGTH.id() => {
                let variance_secs = self.timing.variance_secs();
                self.timing.set_timing(value, variance_secs);
                Ok(())
            }
            _ if id == Self::VARIANCE.id() => {
                let length_secs = self.timing.length_secs();
                self.timing.set_timing(length_secs, value);
                Ok(())
            }
            _ => Err(Error::ParameterError(format!("Unknown parameter: '{id}'"))),
        }
    }

    /// Process one audio block.
    ///
    /// All five streams must have the same length (the host's block size). Pending
    /// control messages are applied first. Then each frame advances the addressed
    /// bin's interpolation by one step and writes the interpolated magnitude and
    /// phase to the output streams.
    pub fn process(
        &mut self,
        magnitude_in: &[f32],
        phase_in: &[f32],
        index_in: &[f32],
        magnitude_out: &mut [f32],
        phase_out: &mut [f32],
    ) {
        debug_assert!(
            magnitude_in.len() == phase_in.len()
                && magnitude_in.len() == index_in.len()
                && magnitude_in.len() == magnitude_out.len()
                && magnitude_in.len() == phase_out.len(),
            "Input and output streams must have equal lengths"
        );

        self.drain_messages();

        Self::assert_no_alloc(|| {
            let frames = magnitude_in.len();

            // Refresh pass: bins flagged at the end of a leg capture a new target
            // from the input at their frame position. The check is indexed by frame
            // position, not by resolved bin, matching the host convention that the
            // index stream counts bins in block order. Bounded by the table size so
            // an oversized block can't index past it.
            let refresh_frames = frames.min(self.bins.len());
            for i in 0..refresh_frames {
                if self.bins.bin(i).needs_new_target() {
                    // The previous target becomes the new baseline, so the emitted
                    // signal never jumps at a leg boundary.
                    self.bins.carry_target_forward(i);
                    self.bins.acquire_new_target(
                        i,
                        magnitude_in[i],
                        phase_in[i],
                        &self.timing,
                        &mut self.rng,
                    );
                }
            }

            // Step pass: advance each addressed bin by one frame and emit it.
            for i in 0..frames {
                let bin = self.bins.resolve_bin(index_in[i]);
                let (magnitude, phase) = self.bins.step(bin);
                magnitude_out[i] = magnitude;
                phase_out[i] = phase;
            }
        });
    }

    /// Apply all pending control messages. Popping and applying is lock- and
    /// allocation-free, so this is safe right before the block gets processed.
    fn drain_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                InterpolatorMessage::SetTiming {
                    length_secs,
                    variance_secs,
                } => {
                    self.timing.set_timing(length_secs, variance_secs);
                }
                InterpolatorMessage::SetParameter { id, value } => {
                    // ids are validated on the handle side
                    let _ = self.process_parameter_update(id, value);
                }
            }
        }
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------
