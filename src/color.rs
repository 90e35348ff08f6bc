//! HSB colors on a 360/100/100 scale (palette)

use palette::{FromColor, Hsv, Srgb};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsb {
    /// Degrees, 0–360.
    pub hue: f32,
    /// Percent, 0–100.
    pub saturation: f32,
    /// Percent, 0–100.
    pub brightness: f32,
}

impl Hsb {
    /// Components outside their range are clamped.
    pub fn new(hue: f32, saturation: f32, brightness: f32) -> Self {
        Self {
            hue: hue.clamp(0.0, 360.0),
            saturation: saturation.clamp(0.0, 100.0),
            brightness: brightness.clamp(0.0, 100.0),
        }
    }

    /// Achromatic color at `percent` brightness.
    pub fn gray(percent: f32) -> Self {
        Self::new(0.0, 0.0, percent)
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let hsv: Hsv = Hsv::new(self.hue, self.saturation / 100.0, self.brightness / 100.0);
        let rgb: Srgb = Srgb::from_color(hsv);
        let rgb: Srgb<u8> = rgb.into_format();
        [rgb.red, rgb.green, rgb.blue, 255]
    }
}

#[cfg(test)]
mod tests {
    use super::Hsb;

    #[test]
    fn primaries() {
        assert_eq!(Hsb::new(0.0, 100.0, 100.0).to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(Hsb::new(120.0, 100.0, 100.0).to_rgba8(), [0, 255, 0, 255]);
        assert_eq!(Hsb::new(240.0, 100.0, 100.0).to_rgba8(), [0, 0, 255, 255]);
        assert_eq!(Hsb::new(360.0, 100.0, 100.0).to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn grays() {
        assert_eq!(Hsb::gray(100.0).to_rgba8(), [255, 255, 255, 255]);
        assert_eq!(Hsb::gray(0.0).to_rgba8(), [0, 0, 0, 255]);
        let [r, g, b, _] = Hsb::gray(15.0).to_rgba8();
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((37..=39).contains(&r));
    }

    #[test]
    fn out_of_range_is_clamped() {
        let c = Hsb::new(725.0, 150.0, -3.0);
        assert_eq!(c, Hsb::new(360.0, 100.0, 0.0));
    }
}
