use crate::config::OverlayLayout;
use crate::error::{PipelineError, Result};
use crate::fonts::{FontSet, TextStyle};
use crate::logok;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayReport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
    pub lines: Vec<String>,
}

/// Trims whitespace, then surrounding quotes, then deletes newlines.
pub fn clean_string(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .replace('\n', "")
}

/// Scales `image` to `new_width`, keeping the aspect ratio.
///
/// Returns the resized image and `new_width / original_width`.
pub fn resize_to_width(image: &DynamicImage, new_width: u32) -> (DynamicImage, f64) {
    let (width, height) = image.dimensions();
    let new_height = (new_width as f64 * height as f64 / width as f64).round() as u32;
    let resized = image.resize_exact(new_width, new_height.max(1), FilterType::Lanczos3);
    (resized, new_width as f64 / width as f64)
}

/// Greedy word wrap using the style's measured width.
pub fn wrap_text(text: &str, max_width: u32, style: &dyn TextStyle) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if style.measure(&candidate) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Draws the header, title and wrapped summary onto the template and saves it.
pub fn compose(
    template: &Path,
    output: &Path,
    title: &str,
    summary: &str,
    fonts: &FontSet,
    layout: &OverlayLayout,
) -> Result<OverlayReport> {
    if !template.is_file() {
        return Err(PipelineError::MissingAsset(template.to_path_buf()));
    }

    let original = image::open(template)?;
    let (resized, scale_factor) = resize_to_width(&original, layout.target_width);
    let mut canvas = resized.to_rgba8();

    let title = clean_string(title);
    let summary = clean_string(summary);
    let color = Rgba(layout.text_color);

    let (hx, hy) = layout.header_pos;
    fonts.regular.draw(&mut canvas, hx, hy, &layout.header, color);
    let (tx, ty) = layout.title_pos;
    fonts.bold.draw(&mut canvas, tx, ty, &title, color);

    let max_width = canvas.width().saturating_sub(layout.side_margin);
    let lines = wrap_text(&summary, max_width, fonts.regular.as_ref());
    let line_height = fonts.bold.nominal_size().round() as i32 + layout.line_spacing as i32;
    let (sx, mut y) = layout.summary_pos;
    for line in &lines {
        fonts.regular.draw(&mut canvas, sx, y, line, color);
        y += line_height;
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas.save(output)?;

    logok(format!(
        "Image written: {} ({}x{}, scale {:.3}, {} summary lines)",
        output.display(),
        canvas.width(),
        canvas.height(),
        scale_factor,
        lines.len()
    ));

    Ok(OverlayReport {
        width: canvas.width(),
        height: canvas.height(),
        scale_factor,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::BlockStyle;
    use image::RgbaImage;

    #[test]
    fn clean_string_removes_newlines_without_substituting() {
        assert_eq!(clean_string("  \"Hello\nWorld\"  "), "HelloWorld");
        assert_eq!(clean_string("'The Knock'\n"), "The Knock");
        assert_eq!(clean_string("plain"), "plain");
    }

    #[test]
    fn resize_keeps_aspect_ratio() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(1000, 500));
        let (resized, scale) = resize_to_width(&image, 600);
        assert_eq!(resized.dimensions(), (600, 300));
        assert!((scale - 0.6).abs() < 1e-9);
    }

    #[test]
    fn resize_rounds_height() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(7, 5));
        let (resized, _) = resize_to_width(&image, 3);
        // 3 * 5 / 7 = 2.14
        assert_eq!(resized.dimensions(), (3, 2));
    }

    #[test]
    fn wrap_uses_measured_width() {
        // 6px per char at size 10
        let style = BlockStyle::new(10.0);
        let lines = wrap_text("aa bb cc dd", 30, &style);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
        for line in &lines {
            assert!(style.measure(line) <= 30);
        }
    }

    #[test]
    fn wrap_keeps_overlong_word_on_its_own_line() {
        let style = BlockStyle::new(10.0);
        let lines = wrap_text("a enormousword b", 30, &style);
        assert_eq!(lines, vec!["a", "enormousword", "b"]);
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap_text("", 100, &BlockStyle::new(10.0)).is_empty());
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = compose(
            &dir.path().join("template.png"),
            &dir.path().join("out.png"),
            "t",
            "s",
            &FontSet::builtin(18.0, 24.0),
            &OverlayLayout::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingAsset(_)));
    }

    #[test]
    fn composes_and_saves_resized_card() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.png");
        RgbaImage::from_pixel(1200, 1000, Rgba([10, 10, 10, 255]))
            .save(&template)
            .unwrap();
        let out = dir.path().join("output/E-template.png");

        let summary = "A keeper hears knocking at a door he bricked up. \
                       It does not stop. Nobody is outside.";
        let report = compose(
            &template,
            &out,
            "\"The Bricked Door\"",
            summary,
            &FontSet::builtin(18.0, 24.0),
            &OverlayLayout::default(),
        )
        .unwrap();

        assert_eq!((report.width, report.height), (600, 500));
        assert!((report.scale_factor - 0.5).abs() < 1e-9);
        assert!(report.lines.len() > 1);
        let words: Vec<&str> = summary.split_whitespace().collect();
        assert_eq!(report.lines.join(" "), words.join(" "));

        let saved = image::open(&out).unwrap();
        assert_eq!(saved.dimensions(), (600, 500));
        // first title glyph box starts at the title offset
        assert_eq!(saved.to_rgba8().get_pixel(10, 40), &Rgba([255, 255, 255, 255]));
    }
}
