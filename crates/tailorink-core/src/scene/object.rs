//! Scene objects as stored in snapshots.
//!
//! Objects keep the drawing library's wire shape (`type`, `left`, `top`,
//! `scaleX`, ...). The `type` string is mapped once, on deserialization, into
//! [`ObjectKind`]; everything past this module dispatches on the enum.

use kurbo::{Affine, BezPath, Ellipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = String;

/// Object type, mapped from the drawing library's `type` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Rect,
    Circle,
    Triangle,
    Path,
    Group,
    Image,
    Text,
    IText,
    Textbox,
    /// A type this editor does not know; preserved verbatim.
    Other(String),
}

/// Editor panel class for an object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    /// Rectangles, circles and triangles.
    Basic,
    /// Vector clipart (groups and paths).
    Clipart,
    /// Raster images.
    Image,
    /// Text objects.
    Text,
}

impl ObjectKind {
    /// Map a library type string into a kind. Matching is case-insensitive.
    pub fn from_type_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "rect" => ObjectKind::Rect,
            "circle" => ObjectKind::Circle,
            "triangle" => ObjectKind::Triangle,
            "path" => ObjectKind::Path,
            "group" => ObjectKind::Group,
            "image" => ObjectKind::Image,
            "text" => ObjectKind::Text,
            "i-text" => ObjectKind::IText,
            "textbox" => ObjectKind::Textbox,
            _ => ObjectKind::Other(value.to_string()),
        }
    }

    /// The library type string for this kind.
    pub fn as_type_str(&self) -> &str {
        match self {
            ObjectKind::Rect => "rect",
            ObjectKind::Circle => "circle",
            ObjectKind::Triangle => "triangle",
            ObjectKind::Path => "path",
            ObjectKind::Group => "group",
            ObjectKind::Image => "image",
            ObjectKind::Text => "text",
            ObjectKind::IText => "i-text",
            ObjectKind::Textbox => "textbox",
            ObjectKind::Other(s) => s,
        }
    }

    /// The editor panel class, or `None` for unknown kinds.
    pub fn class(&self) -> Option<ShapeClass> {
        match self {
            ObjectKind::Rect | ObjectKind::Circle | ObjectKind::Triangle => Some(ShapeClass::Basic),
            ObjectKind::Path | ObjectKind::Group => Some(ShapeClass::Clipart),
            ObjectKind::Image => Some(ShapeClass::Image),
            ObjectKind::Text | ObjectKind::IText | ObjectKind::Textbox => Some(ShapeClass::Text),
            ObjectKind::Other(_) => None,
        }
    }
}

impl Serialize for ObjectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_type_str())
    }
}

impl<'de> Deserialize<'de> for ObjectKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ObjectKind::from_type_str(&value))
    }
}

fn new_object_id() -> ObjectId {
    Uuid::new_v4().to_string()
}

fn unit() -> f64 {
    1.0
}

fn is_unit(value: &f64) -> bool {
    (*value - 1.0).abs() < f64::EPSILON
}

fn is_zero(value: &f64) -> bool {
    value.abs() < f64::EPSILON
}

/// A single object on the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(default = "new_object_id")]
    pub id: ObjectId,
    /// X position of the (unrotated) top-left corner.
    #[serde(default)]
    pub left: f64,
    /// Y position of the (unrotated) top-left corner.
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "unit", skip_serializing_if = "is_unit")]
    pub scale_x: f64,
    #[serde(default = "unit", skip_serializing_if = "is_unit")]
    pub scale_y: f64,
    /// Rotation in degrees around the top-left corner.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub stroke_width: f64,
    #[serde(default = "unit", skip_serializing_if = "is_unit")]
    pub opacity: f64,
    /// SVG path data for `path` objects, in local coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Children of `group` objects, positioned relative to the group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<SceneObject>,
    /// Image source (URL or data URL) for `image` objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

impl SceneObject {
    /// Create an object of the given kind with a fresh ID and neutral style.
    pub fn new(kind: ObjectKind, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            kind,
            id: new_object_id(),
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            opacity: 1.0,
            path: None,
            objects: Vec::new(),
            src: None,
            text: None,
            font_family: None,
            font_size: None,
            font_weight: None,
            font_style: None,
            text_align: None,
            underline: None,
        }
    }

    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(ObjectKind::Rect, left, top, width, height)
    }

    pub fn circle(left: f64, top: f64, radius: f64) -> Self {
        Self::new(ObjectKind::Circle, left, top, radius * 2.0, radius * 2.0)
    }

    pub fn triangle(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(ObjectKind::Triangle, left, top, width, height)
    }

    /// A vector path; `data` is SVG path syntax in local coordinates.
    pub fn path(left: f64, top: f64, data: impl Into<String>) -> Self {
        let data = data.into();
        let (width, height) = BezPath::from_svg(&data)
            .map(|p| {
                let bbox = p.bounding_box();
                (bbox.x1.max(0.0), bbox.y1.max(0.0))
            })
            .unwrap_or((0.0, 0.0));
        let mut object = Self::new(ObjectKind::Path, left, top, width, height);
        object.path = Some(data);
        object
    }

    /// A group; child positions are relative to the group's top-left.
    pub fn group(left: f64, top: f64, children: Vec<SceneObject>) -> Self {
        let (width, height) = children
            .iter()
            .map(|c| c.bounds(Affine::IDENTITY))
            .reduce(|a, b| a.union(b))
            .map(|r| (r.x1.max(0.0), r.y1.max(0.0)))
            .unwrap_or((0.0, 0.0));
        let mut object = Self::new(ObjectKind::Group, left, top, width, height);
        object.objects = children;
        object
    }

    pub fn image(left: f64, top: f64, width: f64, height: f64, src: impl Into<String>) -> Self {
        let mut object = Self::new(ObjectKind::Image, left, top, width, height);
        object.src = Some(src.into());
        object
    }

    /// An editable text object with approximate layout bounds.
    pub fn text(left: f64, top: f64, content: impl Into<String>, font_size: f64) -> Self {
        let content = content.into();
        let width = content.chars().count() as f64 * font_size * 0.6;
        let height = font_size * 1.2;
        let mut object = Self::new(ObjectKind::IText, left, top, width, height);
        object.text = Some(content);
        object.font_size = Some(font_size);
        object
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_stroke(mut self, stroke: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(stroke.into());
        self.stroke_width = width;
        self
    }

    /// Editor panel class for this object.
    pub fn class(&self) -> Option<ShapeClass> {
        self.kind.class()
    }

    /// Local-to-parent transform: translate, then rotate, then scale.
    pub fn transform(&self) -> Affine {
        Affine::translate((self.left, self.top))
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Outline in local coordinates, or `None` for groups and unparsable paths.
    pub fn local_path(&self) -> Option<BezPath> {
        match self.kind {
            ObjectKind::Circle => {
                let radii = (self.width / 2.0, self.height / 2.0);
                Some(Ellipse::new(Point::new(radii.0, radii.1), radii, 0.0).to_path(0.1))
            }
            ObjectKind::Triangle => {
                let mut path = BezPath::new();
                path.move_to((self.width / 2.0, 0.0));
                path.line_to((self.width, self.height));
                path.line_to((0.0, self.height));
                path.close_path();
                Some(path)
            }
            ObjectKind::Path => {
                let data = self.path.as_deref()?;
                match BezPath::from_svg(data) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("Unparsable path data on {}: {}", self.id, e);
                        None
                    }
                }
            }
            ObjectKind::Group => None,
            _ => Some(Rect::new(0.0, 0.0, self.width, self.height).to_path(0.1)),
        }
    }

    /// Bounding box in the coordinate space `parent` maps into.
    pub fn bounds(&self, parent: Affine) -> Rect {
        let affine = parent * self.transform();
        match self.kind {
            ObjectKind::Group => self
                .objects
                .iter()
                .map(|c| c.bounds(affine))
                .reduce(|a, b| a.union(b))
                .unwrap_or_else(|| Rect::from_origin_size(affine * Point::ZERO, (0.0, 0.0))),
            _ => match self.local_path() {
                Some(path) => (affine * path).bounding_box(),
                None => Rect::from_origin_size(affine * Point::ZERO, (0.0, 0.0)),
            },
        }
    }

    /// Distinct fill colors of this object and its descendants, in draw order.
    pub fn fill_colors(&self) -> Vec<String> {
        let mut colors = Vec::new();
        self.collect_fills(&mut colors);
        colors
    }

    fn collect_fills(&self, colors: &mut Vec<String>) {
        if let Some(fill) = self.fill.as_deref() {
            let fill = fill.trim();
            if !fill.is_empty()
                && !fill.eq_ignore_ascii_case("none")
                && !fill.eq_ignore_ascii_case("transparent")
                && !colors.iter().any(|c| c.eq_ignore_ascii_case(fill))
            {
                colors.push(fill.to_string());
            }
        }
        for child in &self.objects {
            child.collect_fills(colors);
        }
    }

    /// Replace every fill equal to `from` (case-insensitive), recursively.
    /// Returns the number of fills changed.
    pub fn recolor(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        if self.fill.as_deref().is_some_and(|f| f.eq_ignore_ascii_case(from)) {
            self.fill = Some(to.to_string());
            changed += 1;
        }
        for child in &mut self.objects {
            changed += child.recolor(from, to);
        }
        changed
    }
}
