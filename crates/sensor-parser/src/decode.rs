//! Conversion of raw dataset values into physical units.
//!
//! Both helpers take the raw buffer by value so it is released as soon as the
//! scaled buffer exists; callers never hold raw and scaled copies together.

use num_traits::AsPrimitive;

/// Fill sentinel used by the `TIR1_BT` dataset.
pub const BT_FILL_VALUE: f32 = -999.0;

/// Replace the fill sentinel with `NaN`, keeping every other value as-is.
pub fn mask_fill_value<T>(raw: Vec<T>, fill: T) -> Vec<f32>
where
    T: AsPrimitive<f32> + PartialEq,
{
    raw.into_iter()
        .map(|v| if v == fill { f32::NAN } else { v.as_() })
        .collect()
}

/// Multiply by `scale_factor`; raw values equal to `fill` become `NaN`.
///
/// The fill comparison happens on the raw value, before scaling.
pub fn scale_with_fill<T>(raw: Vec<T>, scale_factor: f32, fill: T) -> Vec<f32>
where
    T: AsPrimitive<f32> + PartialEq,
{
    raw.into_iter()
        .map(|v| {
            if v == fill {
                f32::NAN
            } else {
                v.as_() * scale_factor
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_fill_value() {
        let bt = mask_fill_value(vec![210.0f32, BT_FILL_VALUE, 250.5], BT_FILL_VALUE);
        assert_eq!(bt[0], 210.0);
        assert!(bt[1].is_nan());
        assert_eq!(bt[2], 250.5);
    }

    #[test]
    fn test_scale_integer_geolocation() {
        let lat = scale_with_fill(vec![1000i16, -32768, -450], 0.01, -32768);
        assert!((lat[0] - 10.0).abs() < 1e-5);
        assert!(lat[1].is_nan());
        assert!((lat[2] + 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_scale_float_geolocation() {
        let lon = scale_with_fill(vec![8000.0f32, 32767.0], 0.01, 32767.0);
        assert!((lon[0] - 80.0).abs() < 1e-4);
        assert!(lon[1].is_nan());
    }
}
