//! Color constants and palettes for figures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    const fn hex(value: u32) -> Self {
        Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid color '{}', expected #RRGGBB", value))
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

pub const BLACK: Rgb = Rgb::hex(0x000000);
pub const GRAY: Rgb = Rgb::hex(0x808080);
pub const STEEL_BLUE: Rgb = Rgb::hex(0x4682B4);
pub const GREEN: Rgb = Rgb::hex(0x008000);
pub const RED: Rgb = Rgb::hex(0xFF0000);
pub const BLUE: Rgb = Rgb::hex(0x0000FF);
pub const PURPLE: Rgb = Rgb::hex(0x800080);
pub const ORANGE: Rgb = Rgb::hex(0xFFA500);
pub const BROWN: Rgb = Rgb::hex(0xA52A2A);
pub const DARK_BLUE: Rgb = Rgb::hex(0x00008B);
pub const DARK_GREEN: Rgb = Rgb::hex(0x006400);
pub const DARK_ORANGE: Rgb = Rgb::hex(0xFF8C00);
pub const TEAL: Rgb = Rgb::hex(0x008080);
pub const CORAL: Rgb = Rgb::hex(0xFF7F50);
pub const MEDIUM_PURPLE: Rgb = Rgb::hex(0x9370DB);
pub const GOLD: Rgb = Rgb::hex(0xFFD700);
pub const LIGHT_CORAL: Rgb = Rgb::hex(0xF08080);
pub const LIGHT_BLUE: Rgb = Rgb::hex(0xADD8E6);
pub const LIGHT_GREEN: Rgb = Rgb::hex(0x90EE90);
pub const WHEAT: Rgb = Rgb::hex(0xF5DEB3);

// Flat UI colors used for single-series entity histograms and status bars.
pub const FLAT_GREEN: Rgb = Rgb::hex(0x2ECC71);
pub const FLAT_RED: Rgb = Rgb::hex(0xE74C3C);
pub const FLAT_BLUE: Rgb = Rgb::hex(0x3498DB);
pub const FLAT_ORANGE: Rgb = Rgb::hex(0xF39C12);
pub const FLAT_PURPLE: Rgb = Rgb::hex(0x9B59B6);
pub const FLAT_CARROT: Rgb = Rgb::hex(0xE67E22);
pub const FLAT_SEA: Rgb = Rgb::hex(0x16A085);

/// Fixed colors for file status bars, cycled when there are more bars.
pub const STATUS_COLORS: [Rgb; 5] = [FLAT_GREEN, FLAT_BLUE, FLAT_RED, FLAT_ORANGE, FLAT_PURPLE];

/// Qualitative palette "Set3".
pub const SET3: [Rgb; 12] = [
    Rgb::hex(0x8DD3C7),
    Rgb::hex(0xFFFFB3),
    Rgb::hex(0xBEBADA),
    Rgb::hex(0xFB8072),
    Rgb::hex(0x80B1D3),
    Rgb::hex(0xFDB462),
    Rgb::hex(0xB3DE69),
    Rgb::hex(0xFCCDE5),
    Rgb::hex(0xD9D9D9),
    Rgb::hex(0xBC80BD),
    Rgb::hex(0xCCEBC5),
    Rgb::hex(0xFFED6F),
];

/// Qualitative palette "tab20".
pub const TAB20: [Rgb; 20] = [
    Rgb::hex(0x1F77B4),
    Rgb::hex(0xAEC7E8),
    Rgb::hex(0xFF7F0E),
    Rgb::hex(0xFFBB78),
    Rgb::hex(0x2CA02C),
    Rgb::hex(0x98DF8A),
    Rgb::hex(0xD62728),
    Rgb::hex(0xFF9896),
    Rgb::hex(0x9467BD),
    Rgb::hex(0xC5B0D5),
    Rgb::hex(0x8C564B),
    Rgb::hex(0xC49C94),
    Rgb::hex(0xE377C2),
    Rgb::hex(0xF7B6D2),
    Rgb::hex(0x7F7F7F),
    Rgb::hex(0xC7C7C7),
    Rgb::hex(0xBCBD22),
    Rgb::hex(0xDBDB8D),
    Rgb::hex(0x17BECF),
    Rgb::hex(0x9EDAE5),
];

/// Qualitative palette "Paired".
pub const PAIRED: [Rgb; 12] = [
    Rgb::hex(0xA6CEE3),
    Rgb::hex(0x1F78B4),
    Rgb::hex(0xB2DF8A),
    Rgb::hex(0x33A02C),
    Rgb::hex(0xFB9A99),
    Rgb::hex(0xE31A1C),
    Rgb::hex(0xFDBF6F),
    Rgb::hex(0xFF7F00),
    Rgb::hex(0xCAB2D6),
    Rgb::hex(0x6A3D9A),
    Rgb::hex(0xFFFF99),
    Rgb::hex(0xB15928),
];

/// Sample `n` colors evenly across a listed palette, first to last.
pub fn sample_palette(palette: &[Rgb], n: usize) -> Vec<Rgb> {
    if palette.is_empty() {
        return vec![GRAY; n];
    }
    let last = palette.len() - 1;
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let idx = ((t * palette.len() as f64) as usize).min(last);
            palette[idx]
        })
        .collect()
}

/// Cycle through `palette` for `n` entries.
pub fn cycle_palette(palette: &[Rgb], n: usize) -> Vec<Rgb> {
    palette.iter().copied().cycle().take(n).collect()
}

/// Semantic color for a PR state: merged is green, closed is red.
pub fn state_color(state: &str) -> Rgb {
    let lower = state.to_lowercase();
    if lower.contains("merge") {
        FLAT_GREEN
    } else if lower.contains("close") {
        FLAT_RED
    } else {
        FLAT_BLUE
    }
}
