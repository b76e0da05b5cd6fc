//! Plot styling passed explicitly to every renderer.
//!
//! Nothing here is process-wide: each render call receives the `PlotStyle` it
//! should use, so two overlays can be drawn with different styles side by side.

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub font_family: String,
    pub font_size: u32,
    /// SVG canvas size in pixels.
    pub width_px: u32,
    pub height_px: u32,
    pub line_width: u32,
    pub marker_size: u32,
    /// Per-experiment colors, cycled when there are more experiments than entries.
    pub palette: Vec<Rgb>,
    pub band_color: Rgb,
    pub band_opacity: f64,
    pub show_band: bool,
    pub show_grid: bool,
    pub x_label: String,
    pub y_label: String,

    /// Terminal plot size in character cells.
    pub ascii_width: usize,
    pub ascii_height: usize,
    /// Per-experiment point glyphs for the terminal plot.
    pub ascii_markers: Vec<char>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            font_family: "serif".to_string(),
            font_size: 14,
            width_px: 1000,
            height_px: 800,
            line_width: 3,
            marker_size: 5,
            palette: vec![
                Rgb(0x32, 0x48, 0x51),
                Rgb(0x86, 0xAC, 0x41),
                Rgb(0x34, 0x67, 0x5C),
                Rgb(0xB3, 0xC1, 0x00),
                Rgb(0x4C, 0xB5, 0xF5),
            ],
            band_color: Rgb(0x7D, 0xA3, 0xA1),
            band_opacity: 0.5,
            show_band: true,
            show_grid: true,
            x_label: "Temperature".to_string(),
            y_label: "Percent of Vacuoles with Domains".to_string(),
            ascii_width: 100,
            ascii_height: 25,
            ascii_markers: vec!['o', 'x', '+', '*', '#', '@'],
        }
    }
}

impl PlotStyle {
    pub fn color_for(&self, index: usize) -> Rgb {
        if self.palette.is_empty() {
            return Rgb(0, 0, 0);
        }
        self.palette[index % self.palette.len()]
    }

    pub fn marker_for(&self, index: usize) -> char {
        if self.ascii_markers.is_empty() {
            return 'o';
        }
        self.ascii_markers[index % self.ascii_markers.len()]
    }
}
