//! SVG and PNG rendering of a scene.

use super::SceneError;
use super::color::parse_color;
use super::object::{ObjectKind, SceneObject};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Affine, Size};
use resvg::usvg::{self, fontdb};
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use tiny_skia::{Pixmap, Transform};

/// Render objects to a standalone SVG document.
pub fn render_svg(size: Size, background: Option<&str>, objects: &[SceneObject]) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink""#,
            r#" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        ),
        w = size.width,
        h = size.height
    );
    if let Some(bg) = background {
        let _ = write!(
            svg,
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            size.width,
            size.height,
            escape_xml(bg)
        );
    }
    for object in objects {
        write_svg_object(&mut svg, object, Affine::IDENTITY);
    }
    svg.push_str("</svg>");
    svg
}

fn write_svg_object(svg: &mut String, object: &SceneObject, parent: Affine) {
    let affine = parent * object.transform();
    let opacity = if (object.opacity - 1.0).abs() > f64::EPSILON {
        format!(r#" opacity="{}""#, object.opacity)
    } else {
        String::new()
    };

    match object.kind {
        ObjectKind::Group => {
            let _ = write!(svg, r#"<g id="{}"{}>"#, escape_xml(&object.id), opacity);
            for child in &object.objects {
                write_svg_object(svg, child, affine);
            }
            svg.push_str("</g>");
        }
        ObjectKind::Image => {
            let Some(src) = object.src.as_deref() else { return };
            let _ = write!(
                svg,
                r#"<image id="{}" href="{}" width="{}" height="{}" transform="{}"{}/>"#,
                escape_xml(&object.id),
                escape_xml(src),
                object.width,
                object.height,
                svg_matrix(affine),
                opacity
            );
        }
        ObjectKind::Text | ObjectKind::IText | ObjectKind::Textbox => {
            let content = object.text.as_deref().unwrap_or_default();
            let font_size = object.font_size.unwrap_or(16.0);
            let (x, anchor) = match object.text_align.as_deref() {
                Some("center") => (object.width / 2.0, "middle"),
                Some("right") => (object.width, "end"),
                _ => (0.0, "start"),
            };
            let _ = write!(
                svg,
                concat!(
                    r#"<text id="{}" x="{}" y="{}" font-size="{}" text-anchor="{}""#,
                    r#" fill="{}" transform="{}"{}"#
                ),
                escape_xml(&object.id),
                x,
                font_size,
                font_size,
                anchor,
                escape_xml(object.fill.as_deref().unwrap_or("#000000")),
                svg_matrix(affine),
                opacity
            );
            match object.font_family.as_deref() {
                Some(family) => {
                    let _ = write!(svg, r#" font-family="{}, sans-serif""#, escape_xml(family));
                }
                None => svg.push_str(r#" font-family="sans-serif""#),
            }
            if let Some(weight) = object.font_weight.as_deref() {
                let _ = write!(svg, r#" font-weight="{}""#, escape_xml(weight));
            }
            if let Some(style) = object.font_style.as_deref() {
                let _ = write!(svg, r#" font-style="{}""#, escape_xml(style));
            }
            if object.underline == Some(true) {
                svg.push_str(r#" text-decoration="underline""#);
            }
            let _ = write!(svg, ">{}</text>", escape_xml(content));
        }
        _ => {
            let Some(path) = object.local_path() else { return };
            let world = affine * path;
            let _ = write!(
                svg,
                r#"<path id="{}" d="{}" fill="{}" stroke="{}" stroke-width="{}"{}/>"#,
                escape_xml(&object.id),
                world.to_svg(),
                escape_xml(object.fill.as_deref().unwrap_or("none")),
                escape_xml(object.stroke.as_deref().unwrap_or("none")),
                object.stroke_width,
                opacity
            );
        }
    }
}

fn svg_matrix(affine: Affine) -> String {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    format!("matrix({} {} {} {} {} {})", a, b, c, d, e, f)
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Font database shared by every raster render.
///
/// System fonts are loaded once. When no face answers the generic families,
/// they are pointed at the first installed family.
fn font_database() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            let generic = fontdb::Query {
                families: &[fontdb::Family::SansSerif],
                ..fontdb::Query::default()
            };
            if db.query(&generic).is_none() {
                let first = db
                    .faces()
                    .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
                if let Some(family) = first {
                    log::debug!("Using {} for generic font families", family);
                    db.set_sans_serif_family(family.clone());
                    db.set_serif_family(family.clone());
                    db.set_monospace_family(family);
                }
            }
            log::debug!("Loaded {} font faces for rasterization", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Rasterize objects at `multiplier`x pixel density and encode as PNG.
pub fn render_png(
    size: Size,
    background: Option<&str>,
    objects: &[SceneObject],
    multiplier: u32,
) -> Result<Vec<u8>, SceneError> {
    let multiplier = multiplier.max(1);
    let width = (size.width * multiplier as f64).round().max(0.0) as u32;
    let height = (size.height * multiplier as f64).round().max(0.0) as u32;
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return Err(SceneError::EmptyRaster { width, height });
    };

    if let Some(bg) = background.and_then(parse_color) {
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
    }

    let svg = render_svg(size, None, objects);
    let options = usvg::Options {
        fontdb: font_database(),
        ..usvg::Options::default()
    };
    let tree =
        usvg::Tree::from_str(&svg, &options).map_err(|e| SceneError::Raster(e.to_string()))?;
    let scale = multiplier as f32;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| SceneError::Encoding(e.to_string()))
}

/// Wrap PNG bytes in a `data:` URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Extract the bytes from a `data:<mime>;base64,` URL.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(png: &[u8]) -> Pixmap {
        Pixmap::decode_png(png).expect("valid png")
    }

    fn rgba(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let pixel = pixmap.pixel(x, y).expect("pixel in bounds").demultiply();
        [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
    }

    #[test]
    fn test_svg_contains_objects() {
        let objects = vec![
            SceneObject::rect(10.0, 10.0, 20.0, 20.0).with_fill("#ff0000"),
            SceneObject::text(0.0, 50.0, "Tom & Jerry", 12.0),
        ];
        let svg = render_svg(Size::new(100.0, 80.0), None, &objects);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains("Tom &amp; Jerry"));
        assert!(svg.contains(r#"width="100""#));
    }

    #[test]
    fn test_svg_text_falls_back_to_generic_family() {
        let mut titled = SceneObject::text(0.0, 0.0, "A", 10.0);
        titled.font_family = Some("Georgia".to_string());
        let objects = vec![SceneObject::text(0.0, 20.0, "B", 10.0), titled];
        let svg = render_svg(Size::new(50.0, 50.0), None, &objects);
        assert!(svg.contains(r#"font-family="sans-serif""#));
        assert!(svg.contains(r#"font-family="Georgia, sans-serif""#));
    }

    #[test]
    fn test_png_dimensions_scale_with_multiplier() {
        let png = render_png(Size::new(10.0, 5.0), None, &[], 4).unwrap();
        let image = decode(&png);
        assert_eq!((image.width(), image.height()), (40, 20));
    }

    #[test]
    fn test_png_fills_rect() {
        let objects = vec![SceneObject::rect(0.0, 0.0, 5.0, 5.0).with_fill("#0000ff")];
        let png = render_png(Size::new(10.0, 10.0), None, &objects, 1).unwrap();
        let image = decode(&png);

        assert_eq!(rgba(&image, 2, 2), [0, 0, 255, 255]);
        assert_eq!(rgba(&image, 8, 8)[3], 0);
    }

    #[test]
    fn test_png_background() {
        let png = render_png(Size::new(2.0, 2.0), Some("#ffffff"), &[], 1).unwrap();
        let image = decode(&png);
        assert_eq!(rgba(&image, 1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn test_png_embedded_image() {
        let mut source = Pixmap::new(2, 2).unwrap();
        source.fill(tiny_skia::Color::from_rgba8(255, 0, 0, 255));
        let source = source.encode_png().unwrap();
        let objects = vec![SceneObject::image(0.0, 0.0, 8.0, 8.0, png_data_url(&source))];
        let png = render_png(Size::new(8.0, 8.0), None, &objects, 1).unwrap();
        let image = decode(&png);
        assert_eq!(rgba(&image, 4, 4), [255, 0, 0, 255]);
    }

    #[test]
    fn test_png_rasterizes_text() {
        if font_database().is_empty() {
            eprintln!("no system fonts installed; skipping text raster check");
            return;
        }
        let objects = vec![SceneObject::text(0.0, 0.0, "HELLO", 20.0).with_fill("#000000")];
        let png = render_png(Size::new(100.0, 30.0), None, &objects, 1).unwrap();
        let image = decode(&png);
        let painted = image.pixels().iter().filter(|p| p.alpha() > 0).count();
        assert!(painted > 0);
    }

    #[test]
    fn test_png_empty_surface_is_error() {
        assert!(matches!(
            render_png(Size::new(0.0, 10.0), None, &[], 4),
            Err(SceneError::EmptyRaster { .. })
        ));
    }

    #[test]
    fn test_data_url_round_trip() {
        let url = png_data_url(&[1, 2, 3]);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url), Some(vec![1, 2, 3]));
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
    }
}
