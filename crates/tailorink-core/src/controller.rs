//! Canvas session controller.
//!
//! Owns the live surface for the active design and routes its events to the
//! listeners bound for that surface's lifetime.

use crate::autosave::AutoSaveDebouncer;
use crate::design::{Design, DesignAggregate, DesignId, TextProps};
use crate::history::DesignHistory;
use crate::scene::{
    ObjectId, SceneObject, ShapeClass, Surface, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};
use kurbo::Size;
use std::time::Instant;

/// Toolbar panel shown for the object under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarMode {
    Shapes,
    Clipart,
    Image,
    Text,
}

impl From<ShapeClass> for ToolbarMode {
    fn from(class: ShapeClass) -> Self {
        match class {
            ShapeClass::Basic => ToolbarMode::Shapes,
            ShapeClass::Clipart => ToolbarMode::Clipart,
            ShapeClass::Image => ToolbarMode::Image,
            ShapeClass::Text => ToolbarMode::Text,
        }
    }
}

/// State published to the editor chrome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorUi {
    pub toolbar: Option<ToolbarMode>,
    /// Distinct fill colors of the selected clipart.
    pub fill_colors: Vec<String>,
    /// Style of the text object last clicked.
    pub text_props: Option<TextProps>,
}

/// A handler bound to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    ColorPicker,
    Toolbar,
    HistoryAction,
    HistoryCommit,
    AutoSave,
}

impl Listener {
    pub const ALL: [Listener; 5] = [
        Listener::ColorPicker,
        Listener::Toolbar,
        Listener::HistoryAction,
        Listener::HistoryCommit,
        Listener::AutoSave,
    ];

    /// Whether this listener receives `kind`.
    pub fn handles(self, kind: SurfaceEventKind) -> bool {
        use SurfaceEventKind::*;
        match self {
            Listener::ColorPicker => {
                matches!(
                    kind,
                    SelectionCreated | SelectionUpdated | SelectionCleared | ObjectRemoved
                )
            }
            Listener::Toolbar => kind == MouseUp,
            Listener::HistoryAction => {
                matches!(kind, ObjectMoving | ObjectScaling | ObjectRotating)
            }
            Listener::HistoryCommit => matches!(kind, ObjectModified | ObjectAdded | ObjectRemoved),
            Listener::AutoSave => AutoSaveDebouncer::watches(kind),
        }
    }
}

/// A surface together with the listeners registered on it.
///
/// Listeners are registered once when the binding is created and released
/// with it. Dropping the binding disposes the surface.
#[derive(Debug)]
pub struct SurfaceBinding<S: Surface> {
    surface: S,
    design_id: DesignId,
    listeners: Vec<Listener>,
}

impl<S: Surface> SurfaceBinding<S> {
    pub fn new(surface: S, design_id: DesignId) -> Self {
        Self {
            surface,
            design_id,
            listeners: Listener::ALL.to_vec(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn design_id(&self) -> &str {
        &self.design_id
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Detach every listener and dispose the surface.
    pub fn dispose(&mut self) {
        self.listeners.clear();
        self.surface.dispose();
    }
}

impl<S: Surface> Drop for SurfaceBinding<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Drives one live surface at a time.
pub struct CanvasController<F: SurfaceFactory> {
    factory: F,
    binding: Option<SurfaceBinding<F::Surface>>,
    ui: EditorUi,
}

impl<F: SurfaceFactory> CanvasController<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            binding: None,
            ui: EditorUi::default(),
        }
    }

    /// Mount a fresh surface for `design`, replacing any previous one.
    ///
    /// The old surface is disposed before the new one is created. A stored
    /// snapshot is restored without recording history.
    pub fn mount(&mut self, design: &Design, history: &mut DesignHistory) {
        self.unmount();
        let size = Size::new(design.apparel.width, design.apparel.height);
        let mut binding = SurfaceBinding::new(self.factory.create(size), design.id.clone());
        history.init(binding.surface_mut());
        if !design.json_design.is_empty() {
            history.restore_design(binding.surface_mut(), &design.json_design);
        }
        log::info!("Mounted surface for design {} ({}x{})", design.id, size.width, size.height);
        self.binding = Some(binding);
    }

    /// Dispose the current surface, if any.
    pub fn unmount(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            log::debug!("Disposing surface for design {}", binding.design_id());
            binding.dispose();
        }
        self.ui = EditorUi::default();
    }

    pub fn is_mounted(&self) -> bool {
        self.binding.is_some()
    }

    pub fn binding(&self) -> Option<&SurfaceBinding<F::Surface>> {
        self.binding.as_ref()
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.binding.as_ref().map(SurfaceBinding::surface)
    }

    pub fn surface_mut(&mut self) -> Option<&mut F::Surface> {
        self.binding.as_mut().map(SurfaceBinding::surface_mut)
    }

    pub fn ui(&self) -> &EditorUi {
        &self.ui
    }

    /// Drain the surface's events and run every listener bound to each one.
    /// Returns the number of events processed.
    pub fn pump(
        &mut self,
        history: &mut DesignHistory,
        autosave: &mut AutoSaveDebouncer,
        now: Instant,
    ) -> usize {
        let Some(binding) = self.binding.as_mut() else {
            return 0;
        };
        let events = binding.surface.take_events();
        for event in &events {
            for listener in binding.listeners.iter().copied().filter(|l| l.handles(event.kind)) {
                match listener {
                    Listener::ColorPicker => sync_colors(&mut self.ui, &binding.surface, event),
                    Listener::Toolbar => switch_toolbar(&mut self.ui, &binding.surface, event),
                    Listener::HistoryAction => history.mark_action(),
                    Listener::HistoryCommit => {
                        history.commit(&binding.surface);
                    }
                    Listener::AutoSave => {
                        autosave.on_event(event, now);
                    }
                }
            }
        }
        events.len()
    }

    /// Add an object to the live surface.
    pub fn add_object(&mut self, object: SceneObject) -> Option<ObjectId> {
        self.surface_mut().map(|surface| surface.add_object(object))
    }

    /// Remove every selected object. Returns how many were removed.
    pub fn remove_selected(&mut self) -> usize {
        let Some(surface) = self.surface_mut() else {
            return 0;
        };
        let ids: Vec<ObjectId> = surface.selected().iter().map(|o| o.id.clone()).collect();
        ids.iter().filter(|id| surface.remove_object(id).is_some()).count()
    }

    /// Replace `from` with `to` in the selected clipart's fills.
    pub fn recolor_selected(&mut self, from: &str, to: &str) -> usize {
        let Some(surface) = self.binding.as_mut().map(SurfaceBinding::surface_mut) else {
            return 0;
        };
        let Some(top) = surface
            .selected()
            .first()
            .filter(|o| o.class() == Some(ShapeClass::Clipart))
            .map(|o| o.id.clone())
        else {
            return 0;
        };
        let mut changed = 0;
        surface.update_object(&top, &mut |object| changed = object.recolor(from, to));
        if let Some(object) = surface.object(&top) {
            self.ui.fill_colors = object.fill_colors();
        }
        changed
    }

    /// Apply a text style to the selected text objects and record it on the
    /// active design. No-op without a selection or an active design.
    pub fn apply_text_props(&mut self, props: &TextProps, aggregate: &mut DesignAggregate) -> bool {
        if aggregate.active().is_none() {
            return false;
        }
        let Some(surface) = self.binding.as_mut().map(SurfaceBinding::surface_mut) else {
            return false;
        };
        let targets: Vec<ObjectId> = surface
            .selected()
            .iter()
            .filter(|o| o.class() == Some(ShapeClass::Text))
            .map(|o| o.id.clone())
            .collect();
        if targets.is_empty() {
            return false;
        }
        for id in &targets {
            surface.update_object(id, &mut |object| props.apply_to(object));
        }
        if let Err(e) = aggregate.update_text_props(props.clone()) {
            log::warn!("Failed to record text style: {}", e);
        }
        self.ui.text_props = Some(props.clone());
        true
    }
}

fn sync_colors(ui: &mut EditorUi, surface: &dyn Surface, event: &SurfaceEvent) {
    match event.kind {
        SurfaceEventKind::SelectionCreated | SurfaceEventKind::SelectionUpdated => {
            ui.fill_colors = surface
                .selected()
                .first()
                .filter(|o| o.class() == Some(ShapeClass::Clipart))
                .map(|o| o.fill_colors())
                .unwrap_or_default();
        }
        _ => ui.fill_colors.clear(),
    }
}

fn switch_toolbar(ui: &mut EditorUi, surface: &dyn Surface, event: &SurfaceEvent) {
    let Some(object) = event.target.as_deref().and_then(|id| surface.object(id)) else {
        return;
    };
    let Some(class) = object.class() else {
        return;
    };
    ui.toolbar = Some(class.into());
    if class == ShapeClass::Text {
        ui.text_props = TextProps::from_object(object);
    }
}

impl<F: SurfaceFactory> Drop for CanvasController<F> {
    fn drop(&mut self) {
        self.unmount();
    }
}
