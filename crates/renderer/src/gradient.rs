//! Color ramps for brightness temperature and mask rendering.

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Control points of an inferno-style ramp, dark (cold) to bright (warm).
const INFERNO_STOPS: [(f32, Color); 8] = [
    (0.0, Color::new(0, 0, 4, 255)),
    (0.14, Color::new(40, 11, 84, 255)),
    (0.29, Color::new(101, 21, 110, 255)),
    (0.43, Color::new(159, 42, 99, 255)),
    (0.57, Color::new(212, 72, 66, 255)),
    (0.71, Color::new(245, 125, 21, 255)),
    (0.86, Color::new(250, 193, 39, 255)),
    (1.0, Color::new(252, 255, 164, 255)),
];

/// Map a normalized value (0-1) onto the inferno ramp.
pub fn inferno_color(normalized: f32) -> Color {
    let t = normalized.clamp(0.0, 1.0);
    for pair in INFERNO_STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            return interpolate_color(c0, c1, (t - t0) / (t1 - t0));
        }
    }
    INFERNO_STOPS[INFERNO_STOPS.len() - 1].1
}

/// Greyscale ramp where 0 is white and 1 is black.
pub fn greys_color(normalized: f32) -> Color {
    let t = normalized.clamp(0.0, 1.0);
    interpolate_color(Color::WHITE, Color::BLACK, t)
}

/// Linear color interpolation
fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;

    Color::new(
        ((color1.r as f32 * t_inv) + (color2.r as f32 * t)).round() as u8,
        ((color1.g as f32 * t_inv) + (color2.g as f32 * t)).round() as u8,
        ((color1.b as f32 * t_inv) + (color2.b as f32 * t)).round() as u8,
        ((color1.a as f32 * t_inv) + (color2.a as f32 * t)).round() as u8,
    )
}

/// Min and max of the non-NaN values, or `None` if there are none.
pub fn value_range(data: &[f32]) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Color for `value` scaled into `[min_val, max_val]`; `NaN` renders white.
#[inline]
pub fn scaled_color<F>(value: f32, min_val: f32, max_val: f32, color_fn: F) -> Color
where
    F: Fn(f32) -> Color,
{
    if value.is_nan() {
        return Color::WHITE;
    }
    let range = max_val - min_val;
    let range = if range.abs() < 0.001 { 1.0 } else { range };
    color_fn((value - min_val) / range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inferno_endpoints() {
        assert_eq!(inferno_color(0.0), Color::new(0, 0, 4, 255));
        assert_eq!(inferno_color(1.0), Color::new(252, 255, 164, 255));
        assert_eq!(inferno_color(-3.0), inferno_color(0.0));
        assert_eq!(inferno_color(7.0), inferno_color(1.0));
    }

    #[test]
    fn test_inferno_brightens() {
        let dark = inferno_color(0.2);
        let bright = inferno_color(0.8);
        let luma = |c: Color| c.r as u32 + c.g as u32 + c.b as u32;
        assert!(luma(bright) > luma(dark));
    }

    #[test]
    fn test_greys() {
        assert_eq!(greys_color(0.0), Color::WHITE);
        assert_eq!(greys_color(1.0), Color::BLACK);
    }

    #[test]
    fn test_value_range_skips_nan() {
        assert_eq!(value_range(&[f32::NAN, 3.0, 1.0]), Some((1.0, 3.0)));
        assert_eq!(value_range(&[f32::NAN]), None);
    }

    #[test]
    fn test_nan_renders_white() {
        assert_eq!(scaled_color(f32::NAN, 0.0, 1.0, inferno_color), Color::WHITE);
        // Flat range does not divide by zero
        assert_eq!(scaled_color(5.0, 5.0, 5.0, greys_color), Color::WHITE);
    }
}
