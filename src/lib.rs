#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod buffer;
mod clock;
mod engine;
mod error;
mod parameter;

// public, flat re-exports
pub use buffer::{BufferPool, SampleBuffer};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use engine::{
    snapshot::{BufferBinding, EngineSnapshot, OverlapStats, SpectrumStats},
    FreezeEngine, PositionChange,
};
pub use error::Error;
pub use parameter::{FloatParameter, FloatParameterValue};

// public mods
pub mod dsp;
