use std::fmt;

// -------------------------------------------------------------------------------------------------

/// The engine's buffer binding state, as reported by [`EngineSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub enum BufferBinding {
    /// No buffer name has been set.
    Unbound,
    /// A name is bound but currently absent from the buffer pool.
    Missing { name: String },
    /// A name is bound and resolves to a buffer in the pool.
    Bound {
        name: String,
        frame_count: usize,
        channel_count: usize,
    },
}

// -------------------------------------------------------------------------------------------------

/// Magnitude statistics over the currently active frozen spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumStats {
    /// Total energy: sum of squared bin magnitudes.
    pub energy: f64,
    /// Largest bin magnitude.
    pub max_magnitude: f64,
    /// Number of bins with magnitude above 1e-6.
    pub nonzero_bins: usize,
    /// The energy every capture is rescaled to.
    pub target_energy: f64,
}

// -------------------------------------------------------------------------------------------------

/// Energy and head contents of one overlap-add accumulator channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapStats {
    pub energy: f64,
    pub max_value: f64,
    /// The first four samples, i.e. what will be drained next.
    pub head: [f64; 4],
}

// -------------------------------------------------------------------------------------------------

/// A read-only report of the engine's configuration, capture state and running synthesis state.
///
/// Produced by [`FreezeEngine::snapshot`](super::FreezeEngine::snapshot); taking a snapshot never
/// mutates the engine. The [`Display`](fmt::Display) implementation renders a multi-line
/// human-readable dump for debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub fft_size: usize,
    pub hop_size: usize,
    pub buffer: BufferBinding,
    pub position: f64,
    pub grain_rate: f64,
    pub phase_randomness: f64,
    pub amplitude_variation: f64,
    pub overlap_amount: f64,
    pub spectrum_captured: bool,
    pub capture_in_progress: bool,
    /// Milliseconds since the last accepted position change, `None` before the first one.
    pub ms_since_position_change: Option<f64>,
    pub hop_counter: usize,
    /// Render tick count at which the next grain will be generated.
    pub next_grain_at: usize,
    /// Spectrum statistics, present only while a capture is active.
    pub spectrum: Option<SpectrumStats>,
    pub overlap_left: OverlapStats,
    pub overlap_right: OverlapStats,
}

impl fmt::Display for EngineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== FREEZE ENGINE STATE ===")?;
        writeln!(f, "FFT Size: {}, Hop Size: {}", self.fft_size, self.hop_size)?;
        match &self.buffer {
            BufferBinding::Unbound => writeln!(f, "Buffer: NONE SET")?,
            BufferBinding::Missing { name } => writeln!(f, "Buffer: {name} (NOT FOUND)")?,
            BufferBinding::Bound {
                name,
                frame_count,
                channel_count,
            } => writeln!(f, "Buffer: {name} ({frame_count} frames, {channel_count} channels)")?,
        }
        writeln!(f, "Position: {:.3}", self.position)?;
        writeln!(
            f,
            "Spectrum Captured: {}",
            if self.spectrum_captured { "YES" } else { "NO" }
        )?;
        writeln!(
            f,
            "Currently Capturing: {}",
            if self.capture_in_progress { "YES" } else { "NO" }
        )?;
        match self.ms_since_position_change {
            Some(ms) => writeln!(f, "Time since last position change: {ms:.1} ms")?,
            None => writeln!(f, "Time since last position change: never changed")?,
        }
        writeln!(f, "Grain Rate: {:.2}", self.grain_rate)?;
        writeln!(f, "Phase Randomness: {:.2}", self.phase_randomness)?;
        writeln!(f, "Amplitude Variation: {:.2}", self.amplitude_variation)?;
        writeln!(f, "Overlap Amount: {:.2}", self.overlap_amount)?;
        writeln!(
            f,
            "Hop Counter: {} (next grain at {})",
            self.hop_counter, self.next_grain_at
        )?;
        if let Some(spectrum) = &self.spectrum {
            writeln!(f, "Spectrum Energy: {:.6}", spectrum.energy)?;
            writeln!(f, "Max Magnitude: {:.6}", spectrum.max_magnitude)?;
            writeln!(
                f,
                "Non-zero bins: {}/{}",
                spectrum.nonzero_bins, self.fft_size
            )?;
            writeln!(f, "Target Energy: {:.6}", spectrum.target_energy)?;
        }
        for (name, stats) in [("L", &self.overlap_left), ("R", &self.overlap_right)] {
            writeln!(
                f,
                "Overlap Buffer {name} - Energy: {:.6}, Max: {:.6}",
                stats.energy, stats.max_value
            )?;
        }
        let head = &self.overlap_left.head;
        writeln!(
            f,
            "Buffer head L: [{:.4}, {:.4}, {:.4}, {:.4}]",
            head[0], head[1], head[2], head[3]
        )?;
        write!(f, "=== END ENGINE STATE ===")
    }
}

// -------------------------------------------------------------------------------------------------
