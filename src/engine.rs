use std::{
    f64::consts::PI,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use four_cc::FourCC;
use num_complex::Complex64;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    buffer::BufferPool,
    clock::{Clock, MonotonicClock},
    dsp::{fft, overlap::OverlapBuffer, window::WindowTable},
    error::Error,
    parameter::{FloatParameter, FloatParameterValue},
};

pub mod snapshot;
use snapshot::{BufferBinding, EngineSnapshot, OverlapStats, SpectrumStats};

// -------------------------------------------------------------------------------------------------

/// Result of a position-change request routed through the engine's debounce gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    /// The request was accepted: the position got stored and a capture was triggered.
    Applied,
    /// The request arrived within the minimum inter-change interval and was dropped
    /// without touching any state.
    Debounced,
}

// -------------------------------------------------------------------------------------------------

// Debounces externally triggered position changes. Requests arriving within the minimum
// inter-change interval are rejected; rejected requests are dropped, not queued.
#[derive(Debug, Default)]
struct CaptureGate {
    last_change_ms: Option<f64>,
}

impl CaptureGate {
    /// Minimum interval between two accepted position changes.
    const MIN_CHANGE_INTERVAL_MS: f64 = 500.0;

    /// Accepts or rejects a position change at the given time. Accepting stamps the time.
    fn try_accept(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_change_ms {
            if now_ms - last < Self::MIN_CHANGE_INTERVAL_MS {
                return false;
            }
        }
        self.last_change_ms = Some(now_ms);
        true
    }

    fn ms_since_last_change(&self, now_ms: f64) -> Option<f64> {
        self.last_change_ms.map(|last| now_ms - last)
    }
}

// -------------------------------------------------------------------------------------------------

/// A spectral freeze drone synthesis engine.
///
/// The engine captures a windowed spectral snapshot from a named buffer in a [`BufferPool`],
/// normalizes it to a fixed target energy, and resynthesizes it indefinitely as a stereo stream
/// of overlapping grains with per-bin phase and amplitude jitter.
///
/// All methods run synchronously in the caller's context; the engine spawns no threads. Control
/// operations ([`set_position`](Self::set_position), [`freeze`](Self::freeze), the parameter
/// setters) are expected to be called from a non-real-time control context, while
/// [`process`](Self::process) is driven once per block from the audio render context.
/// [`process`](Self::process) never fails, blocks or allocates: it emits silence until a capture
/// succeeded, and a grain stream afterwards.
///
/// Each engine instance owns all of its state. Multiple engines may share one `BufferPool`.
#[derive(Debug)]
pub struct FreezeEngine {
    fft_size: usize,
    hop_size: usize,

    buffers: Arc<BufferPool>,
    buffer_name: Option<String>,
    clock: Box<dyn Clock>,
    rng: SmallRng,

    window: WindowTable,
    // Double-buffered frozen spectrum: captures write the inactive slot, then flip the active
    // index with Release ordering, so a render-context reader never observes a half-written
    // spectrum.
    spectrum_slots: [Vec<Complex64>; 2],
    active_slot: AtomicUsize,
    scratch: Vec<Complex64>,
    grain: Vec<f64>,
    overlap_left: OverlapBuffer,
    overlap_right: OverlapBuffer,

    position: FloatParameterValue,
    grain_rate: FloatParameterValue,
    phase_randomness: FloatParameterValue,
    amplitude_variation: FloatParameterValue,
    // Validated and stored, but not consumed by the hop/grain computation.
    overlap_amount: FloatParameterValue,

    gate: CaptureGate,
    spectrum_captured: bool,
    capture_in_progress: bool,
    hop_counter: usize,
}

impl FreezeEngine {
    pub const DEFAULT_FFT_SIZE: usize = 2048;
    pub const MIN_FFT_SIZE: usize = 512;
    pub const MAX_FFT_SIZE: usize = 8192;

    pub const POSITION_ID: FourCC = FourCC(*b"posn");
    pub const GRAIN_RATE_ID: FourCC = FourCC(*b"rate");
    pub const PHASE_RANDOMNESS_ID: FourCC = FourCC(*b"phrd");
    pub const AMPLITUDE_VARIATION_ID: FourCC = FourCC(*b"ampv");
    pub const OVERLAP_AMOUNT_ID: FourCC = FourCC(*b"ovlp");

    /// Fixed differential grain gains for a stereo-width effect. Inherited constants, not a
    /// constant-power pan law. TODO: expose as a width parameter once a pan law is settled.
    const STEREO_SPREAD_LEFT: f64 = 0.8;
    const STEREO_SPREAD_RIGHT: f64 = 1.0;
    /// Fixed attenuation applied to the drained overlap-add output.
    const OUTPUT_ATTENUATION: f64 = 0.1;
    /// Captures are rescaled to a total energy of `fft_size * TARGET_ENERGY_FACTOR`.
    const TARGET_ENERGY_FACTOR: f64 = 0.1;
    /// Captures with less total energy than this are considered silent and left unscaled.
    const ENERGY_EPSILON: f64 = 1e-10;
    /// Bins with magnitude above this count as non-zero in snapshots.
    const NONZERO_BIN_THRESHOLD: f64 = 1e-6;

    /// Create a new engine reading from the given buffer pool.
    ///
    /// `fft_size` must be a power of two in `512..=8192`. Invalid sizes fall back to
    /// [`DEFAULT_FFT_SIZE`](Self::DEFAULT_FFT_SIZE) with a warning; use
    /// [`try_new`](Self::try_new) to treat them as hard errors instead.
    pub fn new(buffers: Arc<BufferPool>, fft_size: usize) -> Self {
        match Self::try_new(buffers.clone(), fft_size) {
            Ok(engine) => engine,
            Err(err) => {
                log::warn!("{err}, using default {}", Self::DEFAULT_FFT_SIZE);
                Self::with_valid_fft_size(buffers, Self::DEFAULT_FFT_SIZE)
            }
        }
    }

    /// Create a new engine, failing with [`Error::InvalidFftSize`] on unsupported sizes.
    pub fn try_new(buffers: Arc<BufferPool>, fft_size: usize) -> Result<Self, Error> {
        let valid = (Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE).contains(&fft_size)
            && fft_size.is_power_of_two();
        if !valid {
            return Err(Error::InvalidFftSize(fft_size));
        }
        Ok(Self::with_valid_fft_size(buffers, fft_size))
    }

    fn with_valid_fft_size(buffers: Arc<BufferPool>, fft_size: usize) -> Self {
        let hop_size = fft_size / 4;
        Self {
            fft_size,
            hop_size,

            buffers,
            buffer_name: None,
            clock: Box::new(MonotonicClock::default()),
            rng: SmallRng::from_os_rng(),

            window: WindowTable::hann(fft_size),
            spectrum_slots: [
                vec![Complex64::new(0.0, 0.0); fft_size],
                vec![Complex64::new(0.0, 0.0); fft_size],
            ],
            active_slot: AtomicUsize::new(0),
            scratch: vec![Complex64::new(0.0, 0.0); fft_size],
            grain: vec![0.0; fft_size],
            overlap_left: OverlapBuffer::new(fft_size),
            overlap_right: OverlapBuffer::new(fft_size),

            position: FloatParameterValue::from_description(FloatParameter::new(
                Self::POSITION_ID,
                "Position",
                0.0..=1.0,
                0.5,
            )),
            grain_rate: FloatParameterValue::from_description(FloatParameter::new(
                Self::GRAIN_RATE_ID,
                "Grain Rate",
                0.1..=4.0,
                1.0,
            )),
            phase_randomness: FloatParameterValue::from_description(FloatParameter::new(
                Self::PHASE_RANDOMNESS_ID,
                "Phase Randomness",
                0.0..=1.0,
                0.1,
            )),
            amplitude_variation: FloatParameterValue::from_description(FloatParameter::new(
                Self::AMPLITUDE_VARIATION_ID,
                "Amplitude Variation",
                0.0..=0.5,
                0.1,
            )),
            overlap_amount: FloatParameterValue::from_description(FloatParameter::new(
                Self::OVERLAP_AMOUNT_ID,
                "Overlap Amount",
                1.0..=8.0,
                4.0,
            )),

            gate: CaptureGate::default(),
            spectrum_captured: false,
            capture_in_progress: false,
            hop_counter: 0,
        }
    }

    /// Replace the engine's clock. Mainly useful with a [`ManualClock`](crate::ManualClock)
    /// in tests and offline renders.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Seed the grain jitter generator for reproducible output.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// The currently active freeze position within the bound buffer, `0.0..=1.0`.
    pub fn position(&self) -> f64 {
        self.position.value()
    }

    /// Whether a frozen spectrum is active, i.e. whether [`process`](Self::process) will
    /// produce audio.
    pub fn spectrum_captured(&self) -> bool {
        self.spectrum_captured
    }

    // ---------------------------------------------------------------------------------------------
    // Control context

    /// Bind a named buffer from the pool as the capture source. The name is resolved lazily at
    /// capture time, so the buffer may be (re-)inserted into the pool later. Rebinding
    /// invalidates the active capture until the next successful one.
    pub fn set_buffer(&mut self, name: impl Into<String>) {
        self.buffer_name = Some(name.into());
        self.spectrum_captured = false;
    }

    /// Unbind the capture source. The engine falls silent until a buffer is bound and captured.
    pub fn clear_buffer(&mut self) {
        self.buffer_name = None;
        self.spectrum_captured = false;
    }

    /// Request a freeze position change, debounced to one accepted change per 500 ms.
    ///
    /// An accepted request clamps and stores the position, invalidates the active capture and
    /// synchronously captures a new spectrum at the new position. A request arriving too soon
    /// after the previous accepted one is dropped wholesale and reports
    /// [`PositionChange::Debounced`].
    ///
    /// An `Err` means the request was applied but the capture failed; the engine then stays
    /// silent until a later capture succeeds.
    pub fn set_position(&mut self, position: f64) -> Result<PositionChange, Error> {
        let now_ms = self.clock.now_ms();
        if !self.gate.try_accept(now_ms) {
            return Ok(PositionChange::Debounced);
        }
        self.position.set_value_clamped(position);
        self.spectrum_captured = false;
        if !self.capture_in_progress {
            self.capture_spectrum()?;
        }
        Ok(PositionChange::Applied)
    }

    /// Force an immediate capture at the current position, bypassing the position-change
    /// debounce. A capture already in progress is not interrupted; the request is then a no-op.
    pub fn freeze(&mut self) -> Result<(), Error> {
        if self.capture_in_progress {
            return Ok(());
        }
        self.capture_spectrum()
    }

    /// Set the grain generation rate, clamped to `0.1..=4.0`. At rate 1.0 a new grain is
    /// generated every `hop_size` render ticks; higher rates generate grains proportionally
    /// more often.
    pub fn set_grain_rate(&mut self, rate: f64) {
        self.grain_rate.set_value_clamped(rate);
    }

    /// Set the per-bin phase jitter amount, clamped to `0.0..=1.0` (full ±π randomization).
    pub fn set_phase_randomness(&mut self, amount: f64) {
        self.phase_randomness.set_value_clamped(amount);
    }

    /// Set the per-bin magnitude jitter amount, clamped to `0.0..=0.5`.
    pub fn set_amplitude_variation(&mut self, amount: f64) {
        self.amplitude_variation.set_value_clamped(amount);
    }

    /// Set the overlap amount, clamped to `1.0..=8.0`. Stored and reported, but currently not
    /// consumed by the grain scheduling.
    pub fn set_overlap_amount(&mut self, amount: f64) {
        self.overlap_amount.set_value_clamped(amount);
    }

    // Wraps a capture run with the in-progress guard and forces the captured flag off on
    // failure. Nothing partial is ever published.
    fn capture_spectrum(&mut self) -> Result<(), Error> {
        self.capture_in_progress = true;
        let result = self.run_capture();
        self.capture_in_progress = false;
        if result.is_err() {
            self.spectrum_captured = false;
        }
        result
    }

    fn run_capture(&mut self) -> Result<(), Error> {
        let name = self.buffer_name.as_deref().ok_or(Error::BufferUnavailable)?;
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| Error::BufferNotFound(name.to_owned()))?;
        let frame_count = buffer.frame_count();
        if frame_count < self.fft_size {
            return Err(Error::BufferTooShort {
                needed: self.fft_size,
                actual: frame_count,
            });
        }

        let start_frame =
            (self.position.value() * (frame_count - self.fft_size) as f64).floor() as usize;
        buffer.read_mono(start_frame, &mut self.grain);
        self.window.apply(&mut self.grain);

        for (bin, sample) in self.scratch.iter_mut().zip(&self.grain) {
            *bin = Complex64::new(*sample, 0.0);
        }
        fft::forward(&mut self.scratch);

        // Rescale to the fixed target energy. The scale depends only on this capture's energy,
        // never on history, so repeated captures can not accumulate gain. Near-silent captures
        // stay unscaled.
        let energy: f64 = self.scratch.iter().map(|bin| bin.norm_sqr()).sum();
        let target_energy = self.fft_size as f64 * Self::TARGET_ENERGY_FACTOR;
        if energy > Self::ENERGY_EPSILON {
            let scale = (target_energy / energy).sqrt();
            for bin in self.scratch.iter_mut() {
                *bin *= scale;
            }
        }

        // Publish into the inactive slot, then flip the active index.
        let inactive_slot = 1 - self.active_slot.load(Ordering::Relaxed);
        self.spectrum_slots[inactive_slot].copy_from_slice(&self.scratch);
        self.active_slot.store(inactive_slot, Ordering::Release);

        self.overlap_left.reset();
        self.overlap_right.reset();
        self.hop_counter = 0;
        self.spectrum_captured = true;

        log::info!(
            "Captured spectrum at position {:.3} (start frame {start_frame})",
            self.position.value()
        );
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Render context

    /// Render one block of output into the given left/right channel buffers.
    ///
    /// Emits silence for the whole block while no spectrum is captured or no buffer is bound,
    /// leaving the overlap accumulators untouched so resynthesis resumes cleanly after the next
    /// capture. Never fails, blocks or allocates.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        assert_eq!(
            left.len(),
            right.len(),
            "Output channels must be equally sized"
        );

        if !self.spectrum_captured || self.buffer_name.is_none() {
            left.fill(0.0);
            right.fill(0.0);
            return;
        }

        let grain_interval = (self.hop_size as f64 / self.grain_rate.value()) as usize;
        for (left, right) in left.iter_mut().zip(right.iter_mut()) {
            self.hop_counter += 1;
            if self.hop_counter >= grain_interval {
                self.hop_counter = 0;
                self.generate_grain();
            }
            *left = (self.overlap_left.pop() * Self::OUTPUT_ATTENUATION) as f32;
            *right = (self.overlap_right.pop() * Self::OUTPUT_ATTENUATION) as f32;
        }
    }

    // Synthesize one grain from the active frozen spectrum and inject it into both overlap
    // accumulators at index 0.
    fn generate_grain(&mut self) {
        let phase_randomness = self.phase_randomness.value();
        let amplitude_variation = self.amplitude_variation.value();

        let active_slot = self.active_slot.load(Ordering::Acquire);
        for (bin, frozen) in self
            .scratch
            .iter_mut()
            .zip(&self.spectrum_slots[active_slot])
        {
            let magnitude = frozen.norm()
                * (1.0 + self.rng.random_range(-1.0..=1.0) * amplitude_variation);
            let phase = frozen.arg() + self.rng.random_range(-PI..=PI) * phase_randomness;
            *bin = Complex64::from_polar(magnitude, phase);
        }
        fft::inverse(&mut self.scratch);

        for (i, sample) in self.grain.iter_mut().enumerate() {
            *sample = self.scratch[i].re * self.window[i];
        }
        self.overlap_left
            .add_grain(self.grain.iter().copied(), Self::STEREO_SPREAD_LEFT);
        self.overlap_right
            .add_grain(self.grain.iter().copied(), Self::STEREO_SPREAD_RIGHT);
    }

    // ---------------------------------------------------------------------------------------------
    // Introspection

    /// Take a read-only snapshot of the engine's configuration and running state.
    pub fn snapshot(&self) -> EngineSnapshot {
        let buffer = match &self.buffer_name {
            None => BufferBinding::Unbound,
            Some(name) => match self.buffers.get(name) {
                None => BufferBinding::Missing { name: name.clone() },
                Some(buffer) => BufferBinding::Bound {
                    name: name.clone(),
                    frame_count: buffer.frame_count(),
                    channel_count: buffer.channel_count(),
                },
            },
        };

        let spectrum = self.spectrum_captured.then(|| {
            let active = &self.spectrum_slots[self.active_slot.load(Ordering::Acquire)];
            let mut energy = 0.0;
            let mut max_magnitude: f64 = 0.0;
            let mut nonzero_bins = 0;
            for bin in active {
                let magnitude = bin.norm();
                energy += magnitude * magnitude;
                max_magnitude = max_magnitude.max(magnitude);
                if magnitude > Self::NONZERO_BIN_THRESHOLD {
                    nonzero_bins += 1;
                }
            }
            SpectrumStats {
                energy,
                max_magnitude,
                nonzero_bins,
                target_energy: self.fft_size as f64 * Self::TARGET_ENERGY_FACTOR,
            }
        });

        let overlap_stats = |buffer: &OverlapBuffer| {
            let mut energy = 0.0;
            let mut max_value: f64 = 0.0;
            for sample in buffer.samples() {
                energy += sample * sample;
                max_value = max_value.max(sample.abs());
            }
            let mut head = [0.0; 4];
            head.copy_from_slice(&buffer.samples()[..4]);
            OverlapStats {
                energy,
                max_value,
                head,
            }
        };

        EngineSnapshot {
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            buffer,
            position: self.position.value(),
            grain_rate: self.grain_rate.value(),
            phase_randomness: self.phase_randomness.value(),
            amplitude_variation: self.amplitude_variation.value(),
            overlap_amount: self.overlap_amount.value(),
            spectrum_captured: self.spectrum_captured,
            capture_in_progress: self.capture_in_progress,
            ms_since_position_change: self.gate.ms_since_last_change(self.clock.now_ms()),
            hop_counter: self.hop_counter,
            next_grain_at: (self.hop_size as f64 / self.grain_rate.value()) as usize,
            spectrum,
            overlap_left: overlap_stats(&self.overlap_left),
            overlap_right: overlap_stats(&self.overlap_right),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{buffer::SampleBuffer, clock::ManualClock};

    const BUFFER_NAME: &str = "src";

    fn sine_buffer(frame_count: usize) -> SampleBuffer {
        SampleBuffer::from_mono(
            (0..frame_count)
                .map(|i| (i as f32 * 0.1).sin() * 0.5)
                .collect(),
        )
    }

    fn test_engine(fft_size: usize, frame_count: usize) -> (FreezeEngine, ManualClock) {
        let pool = Arc::new(BufferPool::new());
        pool.insert(BUFFER_NAME, sine_buffer(frame_count));
        let clock = ManualClock::new(0.0);
        let mut engine = FreezeEngine::new(pool, fft_size)
            .with_clock(clock.clone())
            .with_rng_seed(0x5eed);
        engine.set_buffer(BUFFER_NAME);
        (engine, clock)
    }

    fn render(engine: &mut FreezeEngine, frame_count: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; frame_count];
        let mut right = vec![0.0; frame_count];
        engine.process(&mut left, &mut right);
        (left, right)
    }

    #[test]
    fn invalid_fft_sizes_fall_back_to_default() {
        let pool = Arc::new(BufferPool::new());
        for size in [0, 100, 1000, 256, 16384] {
            assert_eq!(
                FreezeEngine::try_new(Arc::clone(&pool), size).unwrap_err(),
                Error::InvalidFftSize(size)
            );
            assert_eq!(
                FreezeEngine::new(Arc::clone(&pool), size).fft_size(),
                FreezeEngine::DEFAULT_FFT_SIZE
            );
        }
        for size in [512, 1024, 2048, 4096, 8192] {
            let engine = FreezeEngine::try_new(Arc::clone(&pool), size).unwrap();
            assert_eq!(engine.fft_size(), size);
            assert_eq!(engine.hop_size(), size / 4);
        }
    }

    #[test]
    fn capture_normalizes_to_target_energy() {
        for fft_size in [512, 1024, 2048, 4096, 8192] {
            let (mut engine, _) = test_engine(fft_size, fft_size * 4);
            engine.freeze().unwrap();
            assert!(engine.spectrum_captured());
            let stats = engine.snapshot().spectrum.unwrap();
            assert!(
                (stats.energy - fft_size as f64 * 0.1).abs() < 1e-6,
                "energy {} off target for size {fft_size}",
                stats.energy
            );
        }
    }

    #[test]
    fn capture_reads_the_windowed_range_at_position() {
        // With 8192 frames, fft size 2048 and the default position 0.5, the capture reads
        // frames [3072, 5119]. An impulse inside that range produces a full-energy spectrum,
        // one outside leaves the capture silent (and unscaled).
        let fft_size = 2048;
        let frame_count = 8192;

        let mut inside = vec![0.0f32; frame_count];
        inside[4096] = 1.0;
        let pool = Arc::new(BufferPool::new());
        pool.insert(BUFFER_NAME, SampleBuffer::from_mono(inside));
        let mut engine = FreezeEngine::new(Arc::clone(&pool), fft_size).with_rng_seed(1);
        engine.set_buffer(BUFFER_NAME);
        engine.freeze().unwrap();
        let stats = engine.snapshot().spectrum.unwrap();
        assert!((stats.energy - 204.8).abs() < 1e-6);

        let mut outside = vec![0.0f32; frame_count];
        outside[1000] = 1.0;
        pool.insert(BUFFER_NAME, SampleBuffer::from_mono(outside));
        engine.freeze().unwrap();
        let stats = engine.snapshot().spectrum.unwrap();
        assert!(stats.energy < 1e-10);
    }

    #[test]
    fn silent_capture_renders_finite_silence() {
        let pool = Arc::new(BufferPool::new());
        pool.insert(BUFFER_NAME, SampleBuffer::from_mono(vec![0.0; 8192]));
        let mut engine = FreezeEngine::new(pool, 2048).with_rng_seed(2);
        engine.set_buffer(BUFFER_NAME);
        engine.freeze().unwrap();
        assert!(engine.spectrum_captured());

        let (left, right) = render(&mut engine, 4096);
        for sample in left.iter().chain(&right) {
            assert!(sample.is_finite());
            assert_eq!(*sample, 0.0);
        }
    }

    #[test]
    fn stereo_capture_averages_the_first_two_channels() {
        // Anti-phase stereo content cancels in the downmix, so the capture comes out silent.
        let frame_count = 4096;
        let samples: Vec<f32> = (0..frame_count)
            .flat_map(|i| {
                let sample = (i as f32 * 0.1).sin();
                [sample, -sample]
            })
            .collect();
        let pool = Arc::new(BufferPool::new());
        pool.insert(BUFFER_NAME, SampleBuffer::from_interleaved(2, samples));
        let mut engine = FreezeEngine::new(pool, 1024).with_rng_seed(3);
        engine.set_buffer(BUFFER_NAME);
        engine.freeze().unwrap();
        assert!(engine.snapshot().spectrum.unwrap().energy < 1e-10);
    }

    #[test]
    fn render_is_silent_until_captured() {
        let (mut engine, _) = test_engine(2048, 8192);
        assert!(!engine.spectrum_captured());
        for frame_count in [1, 17, 256, 4096] {
            let (left, right) = render(&mut engine, frame_count);
            assert!(left.iter().all(|s| *s == 0.0));
            assert!(right.iter().all(|s| *s == 0.0));
        }
        // skipping the render loop leaves the accumulators untouched
        assert_eq!(engine.snapshot().overlap_left.energy, 0.0);
        assert_eq!(engine.snapshot().hop_counter, 0);
    }

    #[test]
    fn render_produces_audio_after_capture() {
        let (mut engine, _) = test_engine(2048, 8192);
        engine.freeze().unwrap();
        let (left, right) = render(&mut engine, 4096);
        assert!(left.iter().any(|s| *s != 0.0));
        assert!(right.iter().any(|s| *s != 0.0));
        for sample in left.iter().chain(&right) {
            assert!(sample.is_finite());
        }
    }

    #[test]
    fn position_changes_are_clamped() {
        let (mut engine, clock) = test_engine(1024, 8192);
        assert_eq!(engine.set_position(2.0).unwrap(), PositionChange::Applied);
        assert_eq!(engine.position(), 1.0);
        clock.advance(600.0);
        assert_eq!(engine.set_position(-3.0).unwrap(), PositionChange::Applied);
        assert_eq!(engine.position(), 0.0);
    }

    #[test]
    fn rapid_position_changes_are_debounced() {
        let (mut engine, clock) = test_engine(1024, 8192);
        assert_eq!(engine.set_position(0.2).unwrap(), PositionChange::Applied);
        assert!(engine.spectrum_captured());

        clock.advance(200.0);
        assert_eq!(engine.set_position(0.9).unwrap(), PositionChange::Debounced);
        // the rejected request mutated nothing
        assert_eq!(engine.position(), 0.2);
        assert!(engine.spectrum_captured());
        assert_eq!(engine.snapshot().ms_since_position_change, Some(200.0));

        clock.advance(400.0);
        assert_eq!(engine.set_position(0.9).unwrap(), PositionChange::Applied);
        assert_eq!(engine.position(), 0.9);
        assert_eq!(engine.snapshot().ms_since_position_change, Some(0.0));
    }

    #[test]
    fn freeze_bypasses_the_debounce() {
        let (mut engine, clock) = test_engine(1024, 8192);
        engine.set_position(0.3).unwrap();
        clock.advance(100.0);
        assert_eq!(engine.set_position(0.8).unwrap(), PositionChange::Debounced);
        // a manual freeze still captures, at the unchanged position
        engine.freeze().unwrap();
        assert!(engine.spectrum_captured());
        assert_eq!(engine.position(), 0.3);
    }

    #[test]
    fn grain_rate_scales_grain_cadence() {
        // The first grain lands after `hop_size / grain_rate` ticks. Its first windowed sample
        // is exactly zero (Hann edge), so audio starts one tick later.
        let first_audible_tick = |rate: f64| {
            let (mut engine, _) = test_engine(2048, 8192);
            engine.set_grain_rate(rate);
            engine.freeze().unwrap();
            let (left, _) = render(&mut engine, 2048);
            left.iter().position(|s| *s != 0.0).unwrap()
        };
        let slow = first_audible_tick(1.0);
        let fast = first_audible_tick(2.0);
        assert_eq!(slow, 512);
        assert_eq!(fast, 256);
        assert_eq!(slow, fast * 2);
    }

    #[test]
    fn parameter_setters_clamp_to_documented_ranges() {
        let (mut engine, _) = test_engine(1024, 8192);
        engine.set_grain_rate(100.0);
        engine.set_phase_randomness(-1.0);
        engine.set_amplitude_variation(2.0);
        engine.set_overlap_amount(0.0);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.grain_rate, 4.0);
        assert_eq!(snapshot.phase_randomness, 0.0);
        assert_eq!(snapshot.amplitude_variation, 0.5);
        assert_eq!(snapshot.overlap_amount, 1.0);
    }

    #[test]
    fn capture_errors_keep_the_engine_silent() {
        let pool = Arc::new(BufferPool::new());
        let mut engine = FreezeEngine::new(Arc::clone(&pool), 2048).with_rng_seed(4);

        // nothing bound
        assert_eq!(engine.freeze(), Err(Error::BufferUnavailable));

        // bound name missing from the pool
        engine.set_buffer("nope");
        assert_eq!(
            engine.freeze(),
            Err(Error::BufferNotFound("nope".to_owned()))
        );

        // buffer shorter than one analysis window
        pool.insert(BUFFER_NAME, sine_buffer(100));
        engine.set_buffer(BUFFER_NAME);
        assert_eq!(
            engine.freeze(),
            Err(Error::BufferTooShort {
                needed: 2048,
                actual: 100
            })
        );

        assert!(!engine.spectrum_captured());
        assert!(!engine.snapshot().capture_in_progress);
        let (left, _) = render(&mut engine, 256);
        assert!(left.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn rebinding_the_buffer_invalidates_the_capture() {
        let (mut engine, _) = test_engine(2048, 8192);
        engine.freeze().unwrap();
        assert!(engine.spectrum_captured());
        engine.set_buffer(BUFFER_NAME);
        assert!(!engine.spectrum_captured());
        let (left, _) = render(&mut engine, 256);
        assert!(left.iter().all(|s| *s == 0.0));

        engine.clear_buffer();
        assert_eq!(engine.freeze(), Err(Error::BufferUnavailable));
    }

    #[test]
    fn zero_jitter_render_is_deterministic() {
        let render_with_seed = |seed: u64| {
            let (engine, _) = test_engine(1024, 8192);
            let mut engine = engine.with_rng_seed(seed);
            engine.set_phase_randomness(0.0);
            engine.set_amplitude_variation(0.0);
            engine.freeze().unwrap();
            render(&mut engine, 2048)
        };
        // with both jitter amounts at zero, the rng never influences the output
        assert_eq!(render_with_seed(1), render_with_seed(2));
    }

    #[test]
    fn repeated_captures_do_not_accumulate_energy() {
        let (mut engine, clock) = test_engine(2048, 8192);
        for _ in 0..5 {
            engine.freeze().unwrap();
            clock.advance(1000.0);
            let stats = engine.snapshot().spectrum.unwrap();
            assert!((stats.energy - 204.8).abs() < 1e-6);
        }
    }

    #[test]
    fn snapshot_reports_buffer_binding_states() {
        let pool = Arc::new(BufferPool::new());
        let mut engine = FreezeEngine::new(Arc::clone(&pool), 2048);
        assert_eq!(engine.snapshot().buffer, BufferBinding::Unbound);

        engine.set_buffer("pad");
        assert_eq!(
            engine.snapshot().buffer,
            BufferBinding::Missing {
                name: "pad".to_owned()
            }
        );

        pool.insert("pad", sine_buffer(4096));
        assert_eq!(
            engine.snapshot().buffer,
            BufferBinding::Bound {
                name: "pad".to_owned(),
                frame_count: 4096,
                channel_count: 1,
            }
        );
    }

    #[test]
    fn snapshot_tracks_the_render_state() {
        let (mut engine, _) = test_engine(2048, 8192);
        engine.freeze().unwrap();
        let before = engine.snapshot();
        assert_eq!(before.hop_counter, 0);
        assert_eq!(before.next_grain_at, 512);
        assert_eq!(before.overlap_left.energy, 0.0);

        render(&mut engine, 600);
        let after = engine.snapshot();
        assert_eq!(after.hop_counter, 600 - 512);
        assert!(after.overlap_left.energy > 0.0);
        assert!(after.overlap_right.energy > after.overlap_left.energy);
    }
}
