//! Spectral and time-domain DSP building blocks for the freeze engine.

pub mod fft;
pub mod overlap;
pub mod window;
