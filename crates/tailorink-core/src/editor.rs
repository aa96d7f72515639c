//! The design editor session.
//!
//! [`DesignEditor`] ties the surface controller, history, auto-save, design
//! aggregate and export pipeline together around one on-device store.

use crate::autosave::AutoSaveDebouncer;
use crate::config::EditorConfig;
use crate::controller::{CanvasController, EditorUi};
use crate::design::{Apparel, DesignAggregate, DesignError, DesignId, DesignState, TextProps};
use crate::export::{DownloadSink, ExportError, ExportPipeline};
use crate::history::DesignHistory;
use crate::scene::{Surface, SurfaceFactory};
use crate::storage::{LocalStore, StorageResult, keys, load_json, save_json};
use std::sync::Arc;
use std::time::Instant;

/// One editing session over a product's designs.
pub struct DesignEditor<F: SurfaceFactory> {
    config: EditorConfig,
    store: Arc<dyn LocalStore>,
    controller: CanvasController<F>,
    history: DesignHistory,
    autosave: AutoSaveDebouncer,
    aggregate: DesignAggregate,
    export: ExportPipeline,
    background_color: String,
    colors: Vec<String>,
}

impl<F: SurfaceFactory> DesignEditor<F> {
    pub fn new(factory: F, store: Arc<dyn LocalStore>, config: EditorConfig) -> Self {
        Self {
            controller: CanvasController::new(factory),
            history: DesignHistory::new(config.history_limit),
            autosave: AutoSaveDebouncer::new(config.autosave_quiet(), config.png_multiplier),
            export: ExportPipeline::from_config(&config),
            aggregate: DesignAggregate::new(),
            background_color: config.default_apparel_color.clone(),
            colors: Vec::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    pub fn aggregate(&self) -> &DesignAggregate {
        &self.aggregate
    }

    pub fn history(&self) -> &DesignHistory {
        &self.history
    }

    pub fn controller(&self) -> &CanvasController<F> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CanvasController<F> {
        &mut self.controller
    }

    pub fn ui(&self) -> &EditorUi {
        self.controller.ui()
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.controller.surface()
    }

    pub fn surface_mut(&mut self) -> Option<&mut F::Surface> {
        self.controller.surface_mut()
    }

    /// Append a design for a new garment side. The first one is mounted.
    pub fn add_design(&mut self, apparel: Apparel) -> DesignId {
        let id = self.aggregate.add_design(apparel);
        if self.aggregate.active().is_some_and(|d| d.id == id) {
            self.mount_active();
        }
        id
    }

    /// Route pending surface events to their listeners.
    pub fn pump(&mut self, now: Instant) -> usize {
        let before = (self.history.undo_len(), self.history.redo_len());
        let processed = self.controller.pump(&mut self.history, &mut self.autosave, now);
        if before != (self.history.undo_len(), self.history.redo_len()) {
            self.persist_history();
        }
        processed
    }

    /// Pump events, then run a due auto-save. Returns true if a save ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.pump(now);
        match self.controller.surface() {
            Some(surface) => self.autosave.tick(now, surface, &mut self.aggregate),
            None => false,
        }
    }

    /// Save the active design immediately.
    pub fn flush(&mut self) -> bool {
        match self.controller.surface() {
            Some(surface) => self.autosave.flush(surface, &mut self.aggregate),
            None => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        self.step_history(|history, surface| history.undo(surface))
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(|history, surface| history.redo(surface))
    }

    /// Clear history and blank the surface.
    pub fn reset(&mut self) {
        self.step_history(|history, surface| {
            history.reset(surface);
            true
        });
    }

    fn step_history(
        &mut self,
        step: impl FnOnce(&mut DesignHistory, &mut dyn Surface) -> bool,
    ) -> bool {
        let Some(surface) = self.controller.surface_mut() else {
            return false;
        };
        if !step(&mut self.history, surface) {
            return false;
        }
        self.autosave.cancel();
        self.flush();
        self.persist_history();
        true
    }

    /// Save the current design, then switch to `target` and mount it.
    pub fn switch_design(&mut self, target: &str) -> Result<(), DesignError> {
        if self.aggregate.get(target).is_none() {
            return Err(DesignError::NotFound(target.to_string()));
        }
        self.pump(Instant::now());
        self.flush();
        self.aggregate.switch_design(target)?;
        self.mount_active();
        Ok(())
    }

    /// Change the garment color of the active design.
    pub fn update_apparel_color(&mut self, color: &str) -> Result<(), DesignError> {
        self.aggregate.update_apparel_color(color)?;
        if !self.colors.iter().any(|c| c == color) {
            self.colors.push(color.to_string());
        }
        Ok(())
    }

    pub fn set_background_color(&mut self, color: &str) {
        self.background_color = color.to_string();
    }

    /// Apply a text style to the selection and remember it on the design.
    pub fn apply_text_props(&mut self, props: &TextProps) -> bool {
        self.controller.apply_text_props(props, &mut self.aggregate)
    }

    /// Text style to persist alongside the design state.
    pub fn props_state(&self) -> TextProps {
        self.ui()
            .text_props
            .clone()
            .or_else(|| self.aggregate.active().map(|d| d.text_props.clone()))
            .unwrap_or_default()
    }

    /// Composite state of the whole editor.
    pub fn design_state(&self) -> DesignState {
        let canvas_json = self
            .controller
            .surface()
            .and_then(|s| s.snapshot().to_json().ok())
            .unwrap_or_default();
        self.aggregate.to_state(&self.background_color, &canvas_json, &self.colors)
    }

    /// Persist the composite state under `designState`.
    pub fn save_state(&mut self) -> StorageResult<()> {
        self.flush();
        save_json(self.store.as_ref(), keys::DESIGN_STATE, &self.design_state())?;
        save_json(self.store.as_ref(), keys::SAVED_PROPS_STATE, &self.props_state())
    }

    /// Resume from persisted state, preferring a cart line being edited
    /// (`savedDesignState`) over the last session (`designState`).
    ///
    /// Returns false if nothing was stored. Unreadable state is logged and
    /// ignored.
    pub fn restore_state(&mut self) -> bool {
        let state = [keys::SAVED_DESIGN_STATE, keys::DESIGN_STATE]
            .into_iter()
            .find_map(|key| match load_json::<DesignState>(self.store.as_ref(), key) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Ignoring stored {}: {}", key, e);
                    None
                }
            });
        let Some(state) = state else {
            return false;
        };

        self.aggregate = DesignAggregate::from_state(&state);
        if !state.background_color.is_empty() {
            self.background_color = state.background_color.clone();
        }
        self.colors = state.colors.clone();
        self.mount_active();
        if self.config.persist_history {
            let size = self.surface().map(|s| s.size()).unwrap_or_default();
            self.history.rehydrate(self.store.as_ref(), size);
        }
        log::info!("Restored {} designs", self.aggregate.len());
        true
    }

    /// Empty the aggregate, blank the session and clear persisted state.
    pub fn clear_all(&mut self) -> StorageResult<()> {
        self.teardown();
        self.history = DesignHistory::new(self.config.history_limit);
        self.colors.clear();
        self.background_color = self.config.default_apparel_color.clone();
        self.aggregate.clear_all(self.store.as_ref())
    }

    /// Cancel pending saves and dispose the surface.
    pub fn teardown(&mut self) {
        self.autosave.cancel();
        self.controller.unmount();
    }

    pub fn download_design_json(&self, sink: &mut dyn DownloadSink) -> Result<(), ExportError> {
        self.export.download_design_json(&self.aggregate, sink)
    }

    pub fn download_svg(&self, sink: &mut dyn DownloadSink) -> Result<(), ExportError> {
        let surface = self.controller.surface().ok_or(ExportError::NoActiveDesign)?;
        self.export.download_svg(surface, &self.aggregate, sink)
    }

    pub fn download_png(&self, sink: &mut dyn DownloadSink) -> Result<(), ExportError> {
        let surface = self.controller.surface().ok_or(ExportError::NoActiveDesign)?;
        self.export.download_png(surface, &self.aggregate, sink)
    }

    /// Save the active design, then bundle every design's renders.
    pub fn download_zip(&mut self, sink: &mut dyn DownloadSink) -> Result<(), ExportError> {
        self.flush();
        self.export.download_zip(&self.aggregate, sink)
    }

    /// Mount the active design. The history is kept; only its baseline moves
    /// to the new surface.
    fn mount_active(&mut self) {
        self.autosave.cancel();
        let Some(design) = self.aggregate.active() else {
            self.controller.unmount();
            return;
        };
        self.controller.mount(design, &mut self.history);
        let marker = self.controller.surface().and_then(|s| s.snapshot().to_json().ok());
        self.autosave.set_marker(marker);
    }

    fn persist_history(&self) {
        if self.config.persist_history {
            self.history.persist(self.store.as_ref());
        }
    }
}

impl<F: SurfaceFactory> Drop for DesignEditor<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}
