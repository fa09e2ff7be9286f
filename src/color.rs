use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

/// An 8-bit sRGB colour shared by the PNG renderer and the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl From<Rgb> for RGBColor {
    fn from(c: Rgb) -> Self {
        RGBColor(c.0, c.1, c.2)
    }
}

impl From<Rgb> for Color32 {
    fn from(c: Rgb) -> Self {
        Color32::from_rgb(c.0, c.1, c.2)
    }
}

// ---------------------------------------------------------------------------
// Instrument colours
// ---------------------------------------------------------------------------

/// matplotlib's default cycle (C0..C9).
const CYCLE: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// One colour per instrument, stable across timings and layouts.
pub fn instrument_colors(n: usize) -> Vec<Rgb> {
    if n <= CYCLE.len() {
        CYCLE[..n].to_vec()
    } else {
        generate_palette(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_instruments_use_the_default_cycle() {
        let colors = instrument_colors(3);
        assert_eq!(colors, vec![CYCLE[0], CYCLE[1], CYCLE[2]]);
    }

    #[test]
    fn many_instruments_get_distinct_hues() {
        let colors = instrument_colors(12);
        assert_eq!(colors.len(), 12);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn empty_palette() {
        assert!(generate_palette(0).is_empty());
        assert!(instrument_colors(0).is_empty());
    }
}
