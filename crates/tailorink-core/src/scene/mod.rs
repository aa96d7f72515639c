//! The drawing surface boundary.
//!
//! [`Surface`] is the seam between the editor and whatever draws the scene.
//! Mutations enqueue [`SurfaceEvent`]s which the editor drains and routes to
//! its listeners. [`SceneSurface`] is the in-crate implementation.

mod color;
mod object;
mod render;
mod snapshot;
mod surface;

pub use color::{SerializableColor, parse_color};
pub use object::{ObjectId, ObjectKind, SceneObject, ShapeClass};
pub use render::{decode_data_url, png_data_url, render_png, render_svg};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use surface::{SceneSurface, SceneSurfaceFactory};

use kurbo::Size;
use thiserror::Error;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
    #[error("Cannot rasterize a {width}x{height} surface")]
    EmptyRaster { width: u32, height: u32 },
    #[error("Rasterization failed: {0}")]
    Raster(String),
    #[error("PNG encoding error: {0}")]
    Encoding(String),
}

/// Event names emitted by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEventKind {
    ObjectAdded,
    ObjectRemoved,
    ObjectModified,
    ObjectMoving,
    ObjectScaling,
    ObjectRotating,
    SelectionCreated,
    SelectionUpdated,
    SelectionCleared,
    MouseUp,
}

impl SurfaceEventKind {
    /// The drawing library's event name.
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceEventKind::ObjectAdded => "object:added",
            SurfaceEventKind::ObjectRemoved => "object:removed",
            SurfaceEventKind::ObjectModified => "object:modified",
            SurfaceEventKind::ObjectMoving => "object:moving",
            SurfaceEventKind::ObjectScaling => "object:scaling",
            SurfaceEventKind::ObjectRotating => "object:rotating",
            SurfaceEventKind::SelectionCreated => "selection:created",
            SurfaceEventKind::SelectionUpdated => "selection:updated",
            SurfaceEventKind::SelectionCleared => "selection:cleared",
            SurfaceEventKind::MouseUp => "mouse:up",
        }
    }
}

/// An event emitted by a surface, with the object it concerns (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEvent {
    pub kind: SurfaceEventKind,
    pub target: Option<ObjectId>,
}

impl SurfaceEvent {
    pub fn new(kind: SurfaceEventKind, target: Option<ObjectId>) -> Self {
        Self { kind, target }
    }
}

/// A live drawing surface.
///
/// Mutating calls on a disposed surface are ignored.
pub trait Surface {
    /// Surface dimensions in scene units.
    fn size(&self) -> Size;

    /// Resize the surface. Objects keep their coordinates.
    fn set_size(&mut self, size: Size);

    /// Objects in z-order (back to front).
    fn objects(&self) -> &[SceneObject];

    /// Find a top-level object by ID.
    fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects().iter().find(|o| o.id == id)
    }

    /// Add an object on top. Emits `object:added`.
    fn add_object(&mut self, object: SceneObject) -> ObjectId;

    /// Remove an object. Emits `object:removed`.
    fn remove_object(&mut self, id: &str) -> Option<SceneObject>;

    /// Apply an in-place edit to an object. Emits `object:modified`.
    fn update_object(&mut self, id: &str, update: &mut dyn FnMut(&mut SceneObject)) -> bool;

    /// Replace the selection. Emits `selection:created`, `selection:updated`
    /// or `selection:cleared` as appropriate.
    fn select(&mut self, ids: &[ObjectId]);

    fn clear_selection(&mut self) {
        self.select(&[]);
    }

    /// Selected objects, topmost selection first.
    fn selected(&self) -> Vec<&SceneObject>;

    /// Move an object by a delta. Emits `object:moving`.
    fn translate(&mut self, id: &str, dx: f64, dy: f64) -> bool;

    /// Multiply an object's scale. Emits `object:scaling`.
    fn scale(&mut self, id: &str, sx: f64, sy: f64) -> bool;

    /// Rotate an object by `degrees`. Emits `object:rotating`.
    fn rotate(&mut self, id: &str, degrees: f64) -> bool;

    /// End a move/scale/rotate gesture. Emits `object:modified`.
    fn finish_transform(&mut self, id: &str) -> bool;

    /// Pointer released, optionally over an object. Emits `mouse:up`.
    fn pointer_up(&mut self, target: Option<&str>);

    fn background(&self) -> Option<&str>;

    fn set_background(&mut self, color: Option<String>);

    /// Capture the scene.
    fn snapshot(&self) -> Snapshot;

    /// Replace the scene with `snapshot`. Emits `object:added` per object.
    fn load_snapshot(&mut self, snapshot: &Snapshot);

    /// Remove every object and the background.
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Drain queued events, oldest first.
    fn take_events(&mut self) -> Vec<SurfaceEvent>;

    /// Render the scene as SVG.
    fn to_svg(&self) -> String {
        render_svg(self.size(), self.background(), self.objects())
    }

    /// Render the scene as PNG at `multiplier`× pixel density.
    fn to_png(&self, multiplier: u32) -> Result<Vec<u8>, SceneError> {
        render_png(self.size(), self.background(), self.objects(), multiplier)
    }

    /// Release the surface. Queued events are dropped.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Constructs surfaces of a given size.
pub trait SurfaceFactory {
    type Surface: Surface;

    fn create(&self, size: Size) -> Self::Surface;
}
