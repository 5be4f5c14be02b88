use std::ops::RangeInclusive;

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
///
/// Describes a control-rate parameter's identity and value constraints, so generic
/// control surfaces can address parameters by FourCC id and clamp incoming values
/// into their documented bounds.
#[derive(Debug, Clone)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
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

    /// The parameter's unique FourCC id.
    #[inline(always)]
    pub fn id(&self) -> FourCC {
        self.id
    }

    /// The parameter's display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter's unit string, possibly empty.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Clamp the given plain value to the parameter's range.
    pub fn clamp_value(&self, value: f32) -> f32 {
        value.clamp(*self.range.start(), *self.range.end())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_description() {
        const PARAM: FloatParameter =
            FloatParameter::new(FourCC(*b"test"), "Test", 0.0..=10.0, 5.0).with_unit("s");

        assert_eq!(PARAM.id(), FourCC(*b"test"));
        assert_eq!(PARAM.name(), "Test");
        assert_eq!(PARAM.unit(), "s");
        assert_eq!(PARAM.default_value(), 5.0);
        assert_eq!(PARAM.range(), &(0.0..=10.0));
    }

    #[test]
    fn clamps_values_into_range() {
        let param = FloatParameter::new(FourCC(*b"test"), "Test", 0.0..=10.0, 5.0);
        assert_eq!(param.clamp_value(-1.0), 0.0);
        assert_eq!(param.clamp_value(11.0), 10.0);
        assert_eq!(param.clamp_value(2.5), 2.5);
    }
}
