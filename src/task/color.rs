//! Deterministic display colors derived from category names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB display color for a task bar
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TaskColor {
    /// Used for tasks without a category
    pub const UNCATEGORIZED: TaskColor = TaskColor {
        r: 224,
        g: 50,
        b: 212,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hash the category name to a hue/saturation/lightness triple and convert it to RGB.
    ///
    /// The same category always yields the same color, so every bar of a category
    /// matches across months and output formats.
    pub fn for_category(category: &str) -> Self {
        let category = category.trim();
        if category.is_empty() {
            return Self::UNCATEGORIZED;
        }

        let hash = category_hash(category);
        let hue = (hash % 360) as f64;
        let saturation = 0.7 + (hash % 30) as f64 / 100.0;
        let lightness = 0.5 + (hash % 20) as f64 / 100.0;

        Self::from_hsl(hue, saturation, lightness)
    }

    /// Convert HSL (hue in degrees, saturation and lightness in 0..=1) to RGB
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue / 360.0;

        let (r, g, b) = if saturation == 0.0 {
            (lightness, lightness, lightness)
        } else {
            let q = if lightness < 0.5 {
                lightness * (1.0 + saturation)
            } else {
                lightness + saturation - lightness * saturation
            };
            let p = 2.0 * lightness - q;
            (
                hue_to_rgb(p, q, h + 1.0 / 3.0),
                hue_to_rgb(p, q, h),
                hue_to_rgb(p, q, h - 1.0 / 3.0),
            )
        };

        Self {
            r: channel(r),
            g: channel(g),
            b: channel(b),
        }
    }

    /// `#RRGGBB`
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// `r,g,b` as consumed by the markup renderer's RGB color model
    pub fn to_rgb_string(&self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }
}

impl fmt::Display for TaskColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Positional polynomial hash: `hash = hash * 31 + char + index * 7` with wrapping
/// 64-bit arithmetic, where `index` is the byte offset of the character.
fn category_hash(category: &str) -> u64 {
    let hash = category
        .char_indices()
        .fold(0i64, |hash, (index, ch)| {
            hash.wrapping_mul(31)
                .wrapping_add(ch as i64)
                .wrapping_add((index as i64).wrapping_mul(7))
        });
    hash.unsigned_abs()
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

// Truncates like an integer cast of `x * 255`
fn channel(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0) as u8
}
