//! drawtext fragment construction for text overlays.

use crate::filters::escape::{escape_drawtext_text, escape_filter_path, escape_filter_value};
use crate::filters::fonts::FontResolver;
use crate::timeline::TextElementData;
use crate::types::TimeSec;

/// Builds a `drawtext=` filter body for one text element, visible only
/// inside its timeline window.
///
/// The caller wraps the body with stream labels when composing the full
/// filtergraph. When no font file resolves, `fontfile` is omitted and the
/// encoder's default font applies.
pub fn build_drawtext_filter(
    data: &TextElementData,
    start: TimeSec,
    end: TimeSec,
    fonts: &FontResolver,
) -> String {
    let mut filter = format!("drawtext=text='{}'", escape_drawtext_text(&data.content));

    if let Some(font_path) = fonts.resolve(&data.font_family, data.bold, data.italic) {
        filter.push_str(&format!(":fontfile='{}'", escape_filter_path(&font_path)));
    } else {
        filter.push_str(&format!(
            ":font='{}'",
            escape_filter_value(&data.font_family)
        ));
    }

    filter.push_str(&format!(
        ":fontsize={}:fontcolor={}:x={:.0}:y={:.0}:enable='between(t,{:.3},{:.3})'",
        data.font_size,
        data.color.to_filter_color(),
        data.position.x,
        data.position.y,
        start,
        end,
    ));

    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Point2D};

    fn resolver_with_font() -> (tempfile::TempDir, FontResolver) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("TestSans.ttf"), b"").unwrap();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);
        (dir, resolver)
    }

    fn empty_resolver() -> (tempfile::TempDir, FontResolver) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);
        (dir, resolver)
    }

    #[test]
    fn test_basic_drawtext() {
        let (_dir, fonts) = resolver_with_font();
        let data = TextElementData {
            content: "Hello".to_string(),
            font_family: "TestSans".to_string(),
            font_size: 36,
            color: Color::try_from_hex("#FF0000").unwrap(),
            bold: false,
            italic: false,
            position: Point2D::new(100.0, 200.0),
        };

        let filter = build_drawtext_filter(&data, 1.0, 4.5, &fonts);
        assert!(filter.starts_with("drawtext=text='Hello'"));
        assert!(filter.contains("fontfile='"));
        assert!(filter.contains("TestSans.ttf"));
        assert!(filter.contains("fontsize=36"));
        assert!(filter.contains("fontcolor=0xFF0000"));
        assert!(filter.contains("x=100:y=200"));
        assert!(filter.contains("enable='between(t,1.000,4.500)'"));
    }

    #[test]
    fn test_text_is_escaped() {
        let (_dir, fonts) = empty_resolver();
        let data = TextElementData {
            content: "100%: a,b".to_string(),
            ..Default::default()
        };

        let filter = build_drawtext_filter(&data, 0.0, 1.0, &fonts);
        assert!(filter.contains(r"text='100\%\: a\,b'"));
    }

    #[test]
    fn test_missing_font_uses_family_name() {
        let (_dir, fonts) = empty_resolver();
        let data = TextElementData {
            content: "x".to_string(),
            font_family: "Some Family".to_string(),
            ..Default::default()
        };

        let filter = build_drawtext_filter(&data, 0.0, 1.0, &fonts);
        assert!(!filter.contains("fontfile="));
        assert!(filter.contains("font='Some Family'"));
    }

    #[test]
    fn test_alpha_color_rendered() {
        let (_dir, fonts) = empty_resolver();
        let data = TextElementData {
            content: "x".to_string(),
            color: Color::rgba(1.0, 1.0, 1.0, 0.5),
            ..Default::default()
        };

        let filter = build_drawtext_filter(&data, 0.0, 1.0, &fonts);
        assert!(filter.contains("fontcolor=0xFFFFFF@0.50"));
    }
}
