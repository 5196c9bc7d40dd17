//! Engine parameter descriptors and clamped value holders.

use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor: id, name, value bounds, default and unit.
///
/// Descriptors are constant per engine; the mutable state lives in [`FloatParameterValue`].
#[derive(Debug, Clone)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f64>,
    default: f64,
    unit: &'static str,
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f64>,
        default: f64,
    ) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub fn id(&self) -> FourCC {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f64> {
        &self.range
    }

    /// The parameter's default value.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Clamp the given plain value to the parameter's range.
    pub fn clamp_value(&self, value: f64) -> f64 {
        value.clamp(*self.range.start(), *self.range.end())
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds a float parameter value and its description.
#[derive(Debug, Clone)]
pub struct FloatParameterValue {
    /// The parameter's description and constraints.
    description: FloatParameter,
    /// The current value of the parameter.
    value: f64,
}

impl FloatParameterValue {
    /// Create a new parameter value with the given parameter description, initialized to the
    /// parameter's default value.
    pub fn from_description(description: FloatParameter) -> Self {
        let value = description.default_value();
        Self { value, description }
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Access to the current value.
    #[inline(always)]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set a new value, clamping the given value into the parameter's value bounds if necessary.
    pub fn set_value_clamped(&mut self, value: f64) {
        let clamped = self.description.clamp_value(value);
        if clamped != value {
            log::debug!(
                "Clamped out-of-range value {value} for parameter '{}' to {clamped}",
                self.description.name()
            );
        }
        self.value = clamped;
    }
}

impl Display for FloatParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.unit.is_empty() {
            write!(f, "{:.2}", self.value)
        } else {
            write!(f, "{:.2} {}", self.value, self.description.unit)
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ID: FourCC = FourCC(*b"test");

    #[test]
    fn value_starts_at_default() {
        let value =
            FloatParameterValue::from_description(FloatParameter::new(TEST_ID, "Test", 0.0..=1.0, 0.5));
        assert_eq!(value.value(), 0.5);
        assert_eq!(value.description().id(), TEST_ID);
    }

    #[test]
    fn set_value_clamps_into_range() {
        let mut value = FloatParameterValue::from_description(
            FloatParameter::new(TEST_ID, "Test", 0.1..=4.0, 1.0).with_unit("x"),
        );
        value.set_value_clamped(10.0);
        assert_eq!(value.value(), 4.0);
        value.set_value_clamped(-3.0);
        assert_eq!(value.value(), 0.1);
        value.set_value_clamped(2.5);
        assert_eq!(value.value(), 2.5);
        assert_eq!(value.to_string(), "2.50 x");
    }
}
