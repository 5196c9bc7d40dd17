use num_complex::Complex64;

// -------------------------------------------------------------------------------------------------

/// In-place iterative radix-2 forward transform.
///
/// Runs a bit-reversal permutation followed by butterfly stages for `len = 2, 4, .., N`, with the
/// stage twiddle `exp(2πi/len)` multiplied up incrementally per butterfly pair.
///
/// Panics if the buffer length is not a power of two. Callers guarantee this; the engine only ever
/// allocates power-of-two sized spectra.
pub fn forward(data: &mut [Complex64]) {
    let n = data.len();
    assert!(n.is_power_of_two(), "Transform length must be a power of 2");
    if n <= 1 {
        return;
    }

    // bit-reversal permutation
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }

    // butterfly stages
    let mut len = 2;
    while len <= n {
        let angle = 2.0 * std::f64::consts::PI / len as f64;
        let wlen = Complex64::new(angle.cos(), angle.sin());
        for chunk in data.chunks_exact_mut(len) {
            let mut w = Complex64::new(1.0, 0.0);
            let (lower, upper) = chunk.split_at_mut(len / 2);
            for (a, b) in lower.iter_mut().zip(upper.iter_mut()) {
                let u = *a;
                let v = *b * w;
                *a = u + v;
                *b = u - v;
                w *= wlen;
            }
        }
        len <<= 1;
    }
}

// -------------------------------------------------------------------------------------------------

/// In-place inverse transform via conjugation: conjugate, run [`forward`], conjugate again and
/// divide by N. Reuses the forward butterflies instead of maintaining a separate inverse kernel.
pub fn inverse(data: &mut [Complex64]) {
    for value in data.iter_mut() {
        *value = value.conj();
    }
    forward(data);
    let scale = 1.0 / data.len() as f64;
    for value in data.iter_mut() {
        *value = value.conj() * scale;
    }
}

// -------------------------------------------------------------------------------------------------
