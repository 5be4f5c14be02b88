#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod error;
mod interpolator;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use interpolator::{
    bins::{BinState, BinStateTable},
    timing::InterpolationTiming,
    BinInterpolator, InterpolatorHandle, InterpolatorMessage, DEFAULT_TRANSFORM_SIZE,
};

pub use parameter::FloatParameter;
