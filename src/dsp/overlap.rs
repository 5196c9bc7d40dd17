// -------------------------------------------------------------------------------------------------

/// A sliding overlap-add accumulator, one per output channel.
///
/// Grains of the full buffer length are injected additively at index 0, while one sample per
/// render tick is drained from the front. Because grains arrive more often than the buffer fully
/// drains, successive grains overlap inside the accumulator.
///
/// Note that this deliberately differs from textbook overlap-add, which advances the injection
/// offset by the hop size per grain. Here the buffer itself slides: [`pop`](Self::pop) emits the
/// head sample, shifts everything one position toward the front and appends a zero at the tail.
#[derive(Debug, Clone)]
pub struct OverlapBuffer {
    samples: Vec<f64>,
}

impl OverlapBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Zero the entire accumulator, discarding any residual energy from prior material.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
    }

    /// Add a grain into the accumulator starting at index 0, scaled by `gain`.
    /// The grain must not be longer than the accumulator.
    pub fn add_grain(&mut self, grain: impl IntoIterator<Item = f64>, gain: f64) {
        let mut slot = self.samples.iter_mut();
        for sample in grain {
            *slot
                .next()
                .expect("Grain must fit into the overlap buffer") += sample * gain;
        }
    }

    /// Emit the head sample, then slide the accumulator one position toward the front,
    /// appending a zero at the tail.
    #[inline]
    pub fn pop(&mut self) -> f64 {
        let head = self.samples[0];
        self.samples.copy_within(1.., 0);
        *self.samples.last_mut().expect("Buffer is never empty") = 0.0;
        head
    }

    /// Read-only view of the accumulator contents, front first.
    #[inline]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

// -------------------------------------------------------------------------------------------------
