use crate::{logi, logw};
use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Something that can measure and draw a line of text.
pub trait TextStyle: Send + Sync {
    /// Rendered width of `text` in pixels.
    fn measure(&self, text: &str) -> u32;

    /// Nominal pixel size the style was loaded at.
    fn nominal_size(&self) -> f32;

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>);
}

/// A TrueType/OpenType face at a fixed pixel size.
pub struct FontStyle {
    font: Arc<FontVec>,
    scale: PxScale,
}

impl FontStyle {
    pub fn new(font: Arc<FontVec>, size: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(size),
        }
    }
}

impl TextStyle for FontStyle {
    fn measure(&self, text: &str) -> u32 {
        text_size(self.scale, self.font.as_ref(), text).0
    }

    fn nominal_size(&self) -> f32 {
        self.scale.y
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        draw_text_mut(canvas, color, x, y, self.scale, self.font.as_ref(), text);
    }
}

/// Built-in style used when no font file can be loaded.
///
/// Every char advances by 60% of the size; visible chars are drawn as boxes.
pub struct BlockStyle {
    size: f32,
}

impl BlockStyle {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    fn advance(&self) -> u32 {
        ((self.size * 0.6).round() as u32).max(1)
    }
}

impl TextStyle for BlockStyle {
    fn measure(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.advance()
    }

    fn nominal_size(&self) -> f32 {
        self.size
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        let advance = self.advance();
        let glyph_w = advance.saturating_sub(2).max(1);
        let glyph_h = (self.size.round() as u32).max(1);
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let gx = x + (i as u32 * advance) as i32;
            draw_hollow_rect_mut(canvas, Rect::at(gx, y).of_size(glyph_w, glyph_h), color);
        }
    }
}

/// The two styles the title card uses.
pub struct FontSet {
    pub regular: Box<dyn TextStyle>,
    pub bold: Box<dyn TextStyle>,
    pub source: Option<PathBuf>,
}

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(err) => {
            logw(format!("Unusable font {}: {}", path.display(), err));
            None
        }
    }
}

impl FontSet {
    /// Loads the first candidate that parses, else the built-in style.
    pub fn discover(candidates: &[PathBuf], regular_size: f32, bold_size: f32) -> Self {
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            if let Some(font) = load_font(path) {
                logi(format!("Using font {}", path.display()));
                let font = Arc::new(font);
                return Self {
                    regular: Box::new(FontStyle::new(font.clone(), regular_size)),
                    bold: Box::new(FontStyle::new(font, bold_size)),
                    source: Some(path.clone()),
                };
            }
        }

        logw("No usable font found; falling back to the built-in block style");
        Self::builtin(regular_size, bold_size)
    }

    pub fn builtin(regular_size: f32, bold_size: f32) -> Self {
        Self {
            regular: Box::new(BlockStyle::new(regular_size)),
            bold: Box::new(BlockStyle::new(bold_size)),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_style_measures_by_chars() {
        let style = BlockStyle::new(20.0);
        assert_eq!(style.measure("abc"), 36);
        assert_eq!(style.measure(""), 0);
        assert_eq!(style.nominal_size(), 20.0);
    }

    #[test]
    fn block_style_draws_inside_canvas() {
        let mut canvas = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        BlockStyle::new(10.0).draw(&mut canvas, 2, 2, "a b", Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
        // the space between the glyphs stays untouched
        assert_eq!(canvas.get_pixel(10, 6), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn missing_and_invalid_candidates_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.ttf");
        std::fs::write(&junk, b"not a font").unwrap();

        let fonts = FontSet::discover(&[dir.path().join("absent.ttf"), junk], 18.0, 24.0);
        assert!(fonts.source.is_none());
        assert_eq!(fonts.regular.nominal_size(), 18.0);
        assert_eq!(fonts.bold.nominal_size(), 24.0);
    }

    #[test]
    fn real_font_measures_glyph_widths() {
        let candidates = crate::config::Config::default().font_candidates;
        let fonts = FontSet::discover(&candidates, 18.0, 24.0);
        if fonts.source.is_none() {
            // no system font on this machine
            return;
        }

        let style = fonts.regular.as_ref();
        assert!(style.measure("WWWW") > style.measure("iiii"));
        assert!(fonts.bold.measure("Title") > style.measure("Title"));

        let summary = "A family moves into an old farmhouse where a bricked-up door in the \
                       cellar starts knocking back every night, and the knocks grow louder \
                       each time someone answers them from the other side of the wall.";
        let lines = crate::overlay::wrap_text(summary, 580, style);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(style.measure(line) <= 580, "{line:?} is too wide");
        }

        let mut canvas = RgbaImage::from_pixel(200, 40, Rgba([0, 0, 0, 255]));
        style.draw(&mut canvas, 5, 5, "Knock", Rgba([255, 255, 255, 255]));
        assert!(canvas.pixels().any(|p| p[0] > 0));
    }
}
