use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 8-bit RGB color
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);
    /// Marks points whose class has no entry in the color table
    pub const SENTINEL: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0x00RRGGBB`
    pub fn to_packed(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xff) as u8,
            g: ((packed >> 8) & 0xff) as u8,
            b: (packed & 0xff) as u8,
        }
    }

    /// PCL stores colors as the packed integer reinterpreted as a float
    pub fn to_pcl_float(self) -> f32 {
        f32::from_bits(self.to_packed())
    }

    pub fn from_pcl_float(value: f32) -> Self {
        Self::from_packed(value.to_bits())
    }
}

/// Tint applied to raw points for visualization: magenta on the positive y side, green otherwise
pub fn side_tint(y: f64) -> Rgb {
    if y > 0.0 {
        Rgb::MAGENTA
    } else {
        Rgb::GREEN
    }
}

/// Semantic class id as stored in the `label` field of the dataset files
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Color of this class, or `None` if the class is not part of the color table
    pub fn color(self) -> Option<Rgb> {
        match self.0 {
            1 => Some(Rgb::GREEN),
            2 => Some(Rgb::YELLOW),
            3 => Some(Rgb::WHITE),
            4 | 5 | 6 => Some(Rgb::BLUE),
            _ => None,
        }
    }

    pub fn color_or_sentinel(self) -> Rgb {
        self.color().unwrap_or(Rgb::SENTINEL)
    }
}

impl Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table() {
        assert_eq!(ClassId(1).color(), Some(Rgb::GREEN));
        assert_eq!(ClassId(2).color(), Some(Rgb::YELLOW));
        assert_eq!(ClassId(3).color(), Some(Rgb::WHITE));
        for class in 4..=6 {
            assert_eq!(ClassId(class).color(), Some(Rgb::BLUE));
        }
        assert_eq!(ClassId(0).color(), None);
        assert_eq!(ClassId(7).color(), None);
        assert_eq!(ClassId(7).color_or_sentinel(), Rgb::SENTINEL);
    }

    #[test]
    fn test_pcl_float_packing() {
        for color in [Rgb::GREEN, Rgb::YELLOW, Rgb::WHITE, Rgb::BLUE, Rgb::new(12, 34, 56)] {
            assert_eq!(Rgb::from_pcl_float(color.to_pcl_float()), color);
        }
        assert_eq!(Rgb::WHITE.to_packed(), 0x00ff_ffff);
    }

    #[test]
    fn test_side_tint() {
        assert_eq!(side_tint(0.5), Rgb::MAGENTA);
        assert_eq!(side_tint(0.0), Rgb::GREEN);
        assert_eq!(side_tint(-3.0), Rgb::GREEN);
    }
}
