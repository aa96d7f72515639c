//! TailorInk Core Library
//!
//! Platform-agnostic state and logic for the TailorInk garment design editor:
//! the scene surface boundary, per-side designs, undo/redo history, auto-save
//! and artifact export.

pub mod autosave;
pub mod config;
pub mod controller;
pub mod design;
pub mod editor;
pub mod export;
pub mod history;
pub mod scene;
pub mod storage;

pub use autosave::AutoSaveDebouncer;
pub use config::{ConfigError, EditorConfig, PngNaming};
pub use controller::{CanvasController, EditorUi, Listener, SurfaceBinding, ToolbarMode};
pub use design::{
    Apparel, ApparelSide, Design, DesignAggregate, DesignError, DesignId, DesignState, TextProps,
    UploadedImage,
};
pub use editor::DesignEditor;
pub use export::{Artifact, DirectorySink, DownloadSink, ExportError, ExportPipeline, MemorySink};
pub use history::{DesignHistory, HistoryEntry};
pub use scene::{
    ObjectKind, SceneError, SceneObject, SceneSurface, SceneSurfaceFactory, ShapeClass, Snapshot,
    Surface, SurfaceEvent, SurfaceEventKind, SurfaceFactory,
};
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError, StorageResult};
