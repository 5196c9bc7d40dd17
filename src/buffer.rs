use std::sync::Arc;

use dashmap::DashMap;

// -------------------------------------------------------------------------------------------------

/// An immutable, interleaved block of sample frames that the engine captures spectra from.
///
/// Buffers are shared behind an [`Arc`] via a [`BufferPool`], so hosts can swap or remove them at
/// any time without invalidating captures already running against a resolved buffer.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    channel_count: usize,
}

impl SampleBuffer {
    /// Create a buffer from interleaved samples with the given channel count.
    /// The sample count must be an exact multiple of the channel count.
    pub fn from_interleaved(channel_count: usize, samples: Vec<f32>) -> Self {
        debug_assert!(channel_count > 0, "Need at least one channel");
        debug_assert!(
            samples.len() % channel_count == 0,
            "Sample count must be a multiple of the channel count"
        );
        Self {
            samples,
            channel_count,
        }
    }

    /// Create a single-channel buffer.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self::from_interleaved(1, samples)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channel_count
    }

    /// Read `dest.len()` frames starting at `start_frame` into a mono destination buffer.
    /// Multi-channel content is downmixed by averaging the first two channels.
    ///
    /// Panics if the requested range exceeds the buffer; the engine length-checks before reading.
    pub fn read_mono(&self, start_frame: usize, dest: &mut [f64]) {
        assert!(start_frame + dest.len() <= self.frame_count());
        match self.channel_count {
            1 => {
                for (dest, src) in dest.iter_mut().zip(&self.samples[start_frame..]) {
                    *dest = *src as f64;
                }
            }
            _ => {
                for (i, dest) in dest.iter_mut().enumerate() {
                    let frame = (start_frame + i) * self.channel_count;
                    *dest = (self.samples[frame] as f64 + self.samples[frame + 1] as f64) * 0.5;
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A named, concurrently accessible registry of [`SampleBuffer`]s.
///
/// Engines hold an `Arc<BufferPool>` and resolve their bound buffer name at capture time, so a
/// host can replace a buffer's contents between captures by re-inserting under the same name.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: DashMap<String, Arc<SampleBuffer>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a buffer under the given name.
    pub fn insert(&self, name: impl Into<String>, buffer: SampleBuffer) {
        self.buffers.insert(name.into(), Arc::new(buffer));
    }

    /// Remove a buffer. Engines bound to the name will fail their next capture.
    pub fn remove(&self, name: &str) -> Option<Arc<SampleBuffer>> {
        self.buffers.remove(name).map(|(_, buffer)| buffer)
    }

    /// Resolve a buffer by name.
    pub fn get(&self, name: &str) -> Option<Arc<SampleBuffer>> {
        self.buffers.get(name).map(|entry| Arc::clone(entry.value()))
    }
}

// -------------------------------------------------------------------------------------------------
