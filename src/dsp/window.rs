use std::{f64::consts::PI, ops::Index};

// -------------------------------------------------------------------------------------------------

/// A precomputed Hann analysis/synthesis window, immutable after construction.
///
/// The same table is applied before the forward transform at capture time and to every
/// resynthesized grain, so capture and synthesis always stay in agreement about edge tapering.
#[derive(Debug, Clone)]
pub struct WindowTable {
    coefficients: Vec<f64>,
}

impl WindowTable {
    /// Create a Hann window of the given length: `w[i] = 0.5 * (1 - cos(2π·i / (len - 1)))`.
    pub fn hann(len: usize) -> Self {
        debug_assert!(len > 1, "Window length must be > 1");
        let coefficients = (0..len)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (len - 1) as f64).cos()))
            .collect();
        Self { coefficients }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Multiply the given buffer elementwise with the window coefficients.
    pub fn apply(&self, buffer: &mut [f64]) {
        for (sample, coefficient) in buffer.iter_mut().zip(&self.coefficients) {
            *sample *= coefficient;
        }
    }
}

impl Index<usize> for WindowTable {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.coefficients[index]
    }
}

// -------------------------------------------------------------------------------------------------
