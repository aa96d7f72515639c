//! Retained-mode scene surface.

use super::{
    ObjectId, SceneObject, Snapshot, Surface, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};
use kurbo::Size;

/// In-memory drawing surface holding a flat list of top-level objects.
#[derive(Debug, Clone)]
pub struct SceneSurface {
    size: Size,
    background: Option<String>,
    objects: Vec<SceneObject>,
    /// Selected object IDs, topmost first.
    selection: Vec<ObjectId>,
    events: Vec<SurfaceEvent>,
    disposed: bool,
}

impl SceneSurface {
    /// Create an empty surface.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            background: None,
            objects: Vec::new(),
            selection: Vec::new(),
            events: Vec::new(),
            disposed: false,
        }
    }

    fn emit(&mut self, kind: SurfaceEventKind, target: Option<&str>) {
        self.events.push(SurfaceEvent::new(kind, target.map(str::to_string)));
    }

    fn object_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Run `edit` on a live object and emit `kind` if it exists.
    fn edit(
        &mut self,
        id: &str,
        kind: SurfaceEventKind,
        edit: impl FnOnce(&mut SceneObject),
    ) -> bool {
        if self.disposed {
            log::warn!("Ignoring {} on disposed surface", kind.name());
            return false;
        }
        match self.object_mut(id) {
            Some(object) => {
                edit(object);
                self.emit(kind, Some(id));
                true
            }
            None => false,
        }
    }
}

impl Surface for SceneSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id.clone();
        if self.disposed {
            log::warn!("Ignoring object:added on disposed surface");
            return id;
        }
        self.objects.push(object);
        self.emit(SurfaceEventKind::ObjectAdded, Some(&id));
        id
    }

    fn remove_object(&mut self, id: &str) -> Option<SceneObject> {
        if self.disposed {
            return None;
        }
        let index = self.objects.iter().position(|o| o.id == id)?;
        let removed = self.objects.remove(index);
        let was_selected = !self.selection.is_empty();
        self.selection.retain(|s| s != id);
        self.emit(SurfaceEventKind::ObjectRemoved, Some(id));
        if was_selected && self.selection.is_empty() {
            self.emit(SurfaceEventKind::SelectionCleared, None);
        }
        Some(removed)
    }

    fn update_object(&mut self, id: &str, update: &mut dyn FnMut(&mut SceneObject)) -> bool {
        self.edit(id, SurfaceEventKind::ObjectModified, |o| update(o))
    }

    fn select(&mut self, ids: &[ObjectId]) {
        if self.disposed {
            return;
        }
        let next: Vec<ObjectId> = ids
            .iter()
            .filter(|id| self.objects.iter().any(|o| &o.id == *id))
            .cloned()
            .collect();
        let kind = match (self.selection.is_empty(), next.is_empty()) {
            (true, true) => None,
            (true, false) => Some(SurfaceEventKind::SelectionCreated),
            (false, false) if next != self.selection => Some(SurfaceEventKind::SelectionUpdated),
            (false, false) => None,
            (false, true) => Some(SurfaceEventKind::SelectionCleared),
        };
        let target = next.first().cloned();
        self.selection = next;
        if let Some(kind) = kind {
            self.emit(kind, target.as_deref());
        }
    }

    fn selected(&self) -> Vec<&SceneObject> {
        self.selection
            .iter()
            .filter_map(|id| self.objects.iter().find(|o| &o.id == id))
            .collect()
    }

    fn translate(&mut self, id: &str, dx: f64, dy: f64) -> bool {
        self.edit(id, SurfaceEventKind::ObjectMoving, |o| {
            o.left += dx;
            o.top += dy;
        })
    }

    fn scale(&mut self, id: &str, sx: f64, sy: f64) -> bool {
        self.edit(id, SurfaceEventKind::ObjectScaling, |o| {
            o.scale_x *= sx;
            o.scale_y *= sy;
        })
    }

    fn rotate(&mut self, id: &str, degrees: f64) -> bool {
        self.edit(id, SurfaceEventKind::ObjectRotating, |o| {
            o.angle = (o.angle + degrees).rem_euclid(360.0);
        })
    }

    fn finish_transform(&mut self, id: &str) -> bool {
        self.edit(id, SurfaceEventKind::ObjectModified, |_| {})
    }

    fn pointer_up(&mut self, target: Option<&str>) {
        if self.disposed {
            return;
        }
        let target = target.filter(|id| self.objects.iter().any(|o| o.id == *id));
        self.emit(SurfaceEventKind::MouseUp, target);
    }

    fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    fn set_background(&mut self, color: Option<String>) {
        if !self.disposed {
            self.background = color;
        }
    }

    fn set_size(&mut self, size: Size) {
        if !self.disposed {
            self.size = size;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            objects: self.objects.clone(),
            background: self.background.clone(),
            ..Snapshot::empty()
        }
    }

    fn load_snapshot(&mut self, snapshot: &Snapshot) {
        if self.disposed {
            log::warn!("Ignoring snapshot load on disposed surface");
            return;
        }
        self.clear();
        self.background = snapshot.background.clone();
        for object in &snapshot.objects {
            self.objects.push(object.clone());
            self.emit(SurfaceEventKind::ObjectAdded, Some(&object.id));
        }
    }

    fn clear(&mut self) {
        if self.disposed {
            return;
        }
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(SurfaceEventKind::SelectionCleared, None);
        }
        self.objects.clear();
        self.background = None;
    }

    fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.objects.clear();
            self.selection.clear();
            self.events.clear();
            self.disposed = true;
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Factory producing [`SceneSurface`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneSurfaceFactory;

impl SurfaceFactory for SceneSurfaceFactory {
    type Surface = SceneSurface;

    fn create(&self, size: Size) -> SceneSurface {
        SceneSurface::new(size)
    }
}
