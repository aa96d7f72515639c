//! Undo/redo history of scene snapshots.

use crate::scene::{Snapshot, Surface, SurfaceEvent, SurfaceEventKind};
use crate::storage::{LocalStore, keys};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Default maximum number of undo states to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Current on-device history format.
const PERSIST_VERSION: u32 = 1;

/// One recorded scene state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub snapshot: String,
    pub width: f64,
    pub height: f64,
}

impl HistoryEntry {
    /// Captured surface dimensions, if they describe a drawable area.
    pub fn size(&self) -> Option<Size> {
        (self.width > 0.0 && self.height > 0.0).then(|| Size::new(self.width, self.height))
    }

    /// Capture the surface. Returns `None` (and logs) if serialization fails.
    pub fn capture(surface: &dyn Surface) -> Option<Self> {
        let size = surface.size();
        match surface.snapshot().to_json() {
            Ok(snapshot) => Some(Self {
                snapshot,
                width: size.width,
                height: size.height,
            }),
            Err(e) => {
                log::error!("Failed to capture history entry: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStack {
    version: u32,
    entries: Vec<HistoryEntry>,
}

/// Linear undo/redo history over one surface.
///
/// Continuous gestures only mark an action; `object:modified`,
/// `object:added` and `object:removed` commit an entry. Snapshot loads done
/// by the history itself run with saving paused and never record entries.
#[derive(Debug, Clone)]
pub struct DesignHistory {
    /// State the surface was in after the last commit or restore.
    current: Option<HistoryEntry>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    pause_saving: bool,
    action_pending: bool,
    limit: usize,
}

impl Default for DesignHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl DesignHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            current: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pause_saving: false,
            action_pending: false,
            limit: limit.max(1),
        }
    }

    /// Capture the baseline for a freshly mounted surface.
    pub fn init(&mut self, surface: &mut dyn Surface) {
        surface.take_events();
        self.current = HistoryEntry::capture(surface);
        self.action_pending = false;
    }

    /// Load a saved design into the surface without recording history.
    ///
    /// A corrupt snapshot is logged and skipped; returns whether it loaded.
    pub fn restore_design(&mut self, surface: &mut dyn Surface, json_design: &str) -> bool {
        let snapshot = match Snapshot::parse(json_design) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Skipping corrupt design snapshot: {}", e);
                return false;
            }
        };
        self.load_paused(surface, &snapshot);
        self.current = HistoryEntry::capture(surface);
        true
    }

    /// Route a surface event. Returns true if an entry was committed.
    pub fn handle_event(&mut self, surface: &dyn Surface, event: &SurfaceEvent) -> bool {
        if self.pause_saving {
            return false;
        }
        match event.kind {
            SurfaceEventKind::ObjectMoving
            | SurfaceEventKind::ObjectScaling
            | SurfaceEventKind::ObjectRotating => {
                self.mark_action();
                false
            }
            SurfaceEventKind::ObjectModified
            | SurfaceEventKind::ObjectAdded
            | SurfaceEventKind::ObjectRemoved => self.commit(surface),
            _ => false,
        }
    }

    /// Note that a gesture is in progress.
    pub fn mark_action(&mut self) {
        self.action_pending = true;
    }

    pub fn has_pending_action(&self) -> bool {
        self.action_pending
    }

    /// Record the surface's state as a new entry.
    ///
    /// The previous state goes onto the undo stack and the redo stack is
    /// cleared. A state identical to the current one is not recorded.
    pub fn commit(&mut self, surface: &dyn Surface) -> bool {
        if self.pause_saving {
            return false;
        }
        self.action_pending = false;
        let Some(next) = HistoryEntry::capture(surface) else {
            return false;
        };
        if self.current.as_ref().is_some_and(|c| c.snapshot == next.snapshot) {
            return false;
        }
        if let Some(previous) = self.current.replace(next) {
            self.undo_stack.push(previous);
            if self.undo_stack.len() > self.limit {
                self.undo_stack.remove(0);
            }
        }
        self.redo_stack.clear();
        true
    }

    /// Step back one entry. No-op when there is nothing to undo.
    pub fn undo(&mut self, surface: &mut dyn Surface) -> bool {
        let Some(entry) = self.pop_valid(true) else {
            return false;
        };
        self.step(surface, entry, false)
    }

    /// Step forward one entry. No-op when there is nothing to redo.
    pub fn redo(&mut self, surface: &mut dyn Surface) -> bool {
        let Some(entry) = self.pop_valid(false) else {
            return false;
        };
        self.step(surface, entry, true)
    }

    /// Clear both stacks and blank the surface.
    pub fn reset(&mut self, surface: &mut dyn Surface) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pause_saving = true;
        surface.clear();
        surface.take_events();
        self.pause_saving = false;
        self.current = HistoryEntry::capture(surface);
        self.action_pending = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_saving
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.as_ref()
    }

    /// Mirror both stacks to the store. Failures are logged, never returned.
    pub fn persist(&self, store: &dyn LocalStore) {
        let stacks = [(keys::UNDO_STACK, &self.undo_stack), (keys::REDO_STACK, &self.redo_stack)];
        for (key, entries) in stacks {
            let stack = PersistedStack {
                version: PERSIST_VERSION,
                entries: entries.clone(),
            };
            let result = serde_json::to_string(&stack)
                .map_err(|e| e.to_string())
                .and_then(|json| store.set(key, &json).map_err(|e| e.to_string()));
            if let Err(e) = result {
                log::error!("Failed to persist {}: {}", key, e);
            }
        }
    }

    /// Load both stacks from the store, replacing the in-memory ones.
    ///
    /// Legacy entries without dimensions take `fallback_size`. Invalid entries
    /// are dropped; unreadable stacks are ignored.
    pub fn rehydrate(&mut self, store: &dyn LocalStore, fallback_size: Size) {
        self.undo_stack = load_stack(store, keys::UNDO_STACK, fallback_size);
        self.redo_stack = load_stack(store, keys::REDO_STACK, fallback_size);
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
        log::info!(
            "Rehydrated history: {} undo, {} redo",
            self.undo_stack.len(),
            self.redo_stack.len()
        );
    }

    /// Pop the next entry whose snapshot parses, discarding corrupt ones.
    fn pop_valid(&mut self, from_undo: bool) -> Option<(HistoryEntry, Snapshot)> {
        let stack = if from_undo { &mut self.undo_stack } else { &mut self.redo_stack };
        while let Some(entry) = stack.pop() {
            match Snapshot::parse(&entry.snapshot) {
                Ok(snapshot) => return Some((entry, snapshot)),
                Err(e) => log::warn!("Dropping corrupt history entry: {}", e),
            }
        }
        None
    }

    fn step(
        &mut self,
        surface: &mut dyn Surface,
        (entry, snapshot): (HistoryEntry, Snapshot),
        forward: bool,
    ) -> bool {
        if let Some(current) = self.current.take() {
            if forward {
                self.undo_stack.push(current);
            } else {
                self.redo_stack.push(current);
            }
        }
        if let Some(size) = entry.size() {
            if size != surface.size() {
                surface.set_size(size);
            }
        }
        self.load_paused(surface, &snapshot);
        self.current = Some(entry);
        self.action_pending = false;
        true
    }

    fn load_paused(&mut self, surface: &mut dyn Surface, snapshot: &Snapshot) {
        self.pause_saving = true;
        surface.load_snapshot(snapshot);
        // Events from the load are ours, not user edits.
        surface.take_events();
        self.pause_saving = false;
    }
}

fn load_stack(store: &dyn LocalStore, key: &str, fallback_size: Size) -> Vec<HistoryEntry> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            return Vec::new();
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", key, e);
            return Vec::new();
        }
    };

    let entries = match value {
        serde_json::Value::Array(items) => {
            log::info!("Migrating legacy {} ({} entries)", key, items.len());
            items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(snapshot) => Some(HistoryEntry {
                        snapshot,
                        width: fallback_size.width,
                        height: fallback_size.height,
                    }),
                    other => {
                        log::warn!("Dropping legacy {} entry: {}", key, other);
                        None
                    }
                })
                .collect()
        }
        value => match serde_json::from_value::<PersistedStack>(value) {
            Ok(stack) if stack.version == PERSIST_VERSION => stack.entries,
            Ok(stack) => {
                log::warn!("Ignoring {} with unsupported version {}", key, stack.version);
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Ignoring malformed {}: {}", key, e);
                return Vec::new();
            }
        },
    };

    entries
        .into_iter()
        .filter(|entry| match Snapshot::parse(&entry.snapshot) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Dropping invalid {} entry: {}", key, e);
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneObject, SceneSurface};
    use crate::storage::MemoryStore;

    fn surface() -> SceneSurface {
        SceneSurface::new(Size::new(200.0, 200.0))
    }

    /// Add one object and feed the resulting events to the history.
    fn edit(history: &mut DesignHistory, surface: &mut SceneSurface, n: usize) -> String {
        surface.add_object(SceneObject::rect(n as f64, 0.0, 5.0, 5.0).with_fill("#000000"));
        for event in surface.take_events() {
            history.handle_event(&*surface, &event);
        }
        surface.snapshot().to_json().unwrap()
    }

    fn scene(surface: &SceneSurface) -> String {
        surface.snapshot().to_json().unwrap()
    }

    #[test]
    fn test_history_linearity() {
        for n in 1..=5usize {
            for m in 0..=n {
                for k in 0..=m {
                    let mut surface = surface();
                    let mut history = DesignHistory::default();
                    history.init(&mut surface);
                    let mut states = vec![scene(&surface)];
                    for i in 0..n {
                        states.push(edit(&mut history, &mut surface, i));
                    }
                    for _ in 0..m {
                        assert!(history.undo(&mut surface));
                    }
                    for _ in 0..k {
                        assert!(history.redo(&mut surface));
                    }
                    assert_eq!(scene(&surface), states[n - m + k], "n={} m={} k={}", n, m, k);
                }
            }
        }
    }

    #[test]
    fn test_edit_after_undo_clears_redo() {
        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        edit(&mut history, &mut surface, 1);
        edit(&mut history, &mut surface, 2);

        assert!(history.undo(&mut surface));
        assert!(history.can_redo());
        edit(&mut history, &mut surface, 3);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut surface));
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        assert!(!history.undo(&mut surface));
        assert!(!history.redo(&mut surface));
        assert!(surface.take_events().is_empty());
    }

    #[test]
    fn test_gestures_only_mark_action() {
        let mut surface = surface();
        let mut history = DesignHistory::default();
        let id = surface.add_object(SceneObject::rect(0.0, 0.0, 5.0, 5.0));
        history.init(&mut surface);

        surface.translate(&id, 1.0, 1.0);
        surface.rotate(&id, 10.0);
        for event in surface.take_events() {
            assert!(!history.handle_event(&surface, &event));
        }
        assert!(history.has_pending_action());
        assert_eq!(history.undo_len(), 0);

        surface.finish_transform(&id);
        let committed: Vec<bool> =
            surface.take_events().iter().map(|e| history.handle_event(&surface, e)).collect();
        assert_eq!(committed, vec![true]);
        assert!(!history.has_pending_action());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_restore_design_records_nothing() {
        let mut source = surface();
        source.add_object(SceneObject::circle(10.0, 10.0, 4.0));
        let json = scene(&source);

        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        assert!(history.restore_design(&mut surface, &json));

        assert_eq!(scene(&surface), json);
        assert!(!history.can_undo());
        assert!(surface.take_events().is_empty());
        assert!(!history.is_paused());
    }

    #[test]
    fn test_restore_corrupt_design_is_skipped() {
        let mut surface = surface();
        surface.add_object(SceneObject::rect(0.0, 0.0, 1.0, 1.0));
        let mut history = DesignHistory::default();
        history.init(&mut surface);

        assert!(!history.restore_design(&mut surface, "{not json"));
        assert_eq!(surface.objects().len(), 1);
    }

    #[test]
    fn test_undo_restores_captured_dimensions() {
        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        edit(&mut history, &mut surface, 1);

        surface.set_size(Size::new(80.0, 120.0));
        edit(&mut history, &mut surface, 2);
        assert_eq!(history.current().unwrap().size(), Some(Size::new(80.0, 120.0)));

        assert!(history.undo(&mut surface));
        assert_eq!(surface.size(), Size::new(200.0, 200.0));
        assert!(history.redo(&mut surface));
        assert_eq!(surface.size(), Size::new(80.0, 120.0));
    }

    #[test]
    fn test_reset() {
        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        edit(&mut history, &mut surface, 1);
        edit(&mut history, &mut surface, 2);
        history.undo(&mut surface);

        history.reset(&mut surface);
        assert!(surface.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut surface = surface();
        let mut history = DesignHistory::new(3);
        history.init(&mut surface);
        for i in 0..6 {
            edit(&mut history, &mut surface, i);
        }
        assert_eq!(history.undo_len(), 3);
    }

    #[test]
    fn test_persist_and_rehydrate() {
        let store = MemoryStore::new();
        let mut surface = surface();
        let mut history = DesignHistory::default();
        history.init(&mut surface);
        edit(&mut history, &mut surface, 1);
        edit(&mut history, &mut surface, 2);
        history.undo(&mut surface);
        history.persist(&store);

        let raw = store.get(keys::UNDO_STACK).unwrap().unwrap();
        assert!(raw.starts_with("{\"version\":1"));

        let mut restored = DesignHistory::default();
        restored.rehydrate(&store, Size::new(10.0, 10.0));
        assert_eq!(restored.undo_len(), 1);
        assert_eq!(restored.redo_len(), 1);
    }

    #[test]
    fn test_rehydrate_migrates_legacy_and_drops_invalid() {
        let store = MemoryStore::new();
        let valid = Snapshot::empty().to_json().unwrap();
        let legacy = serde_json::to_string(&vec![valid.clone(), "{broken".to_string()]).unwrap();
        store.set(keys::UNDO_STACK, &legacy).unwrap();
        store.set(keys::REDO_STACK, "{\"version\":99,\"entries\":[]}").unwrap();

        let mut history = DesignHistory::default();
        history.rehydrate(&store, Size::new(300.0, 400.0));

        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
        let mut surface = surface();
        history.init(&mut surface);
        assert!(history.undo(&mut surface));
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn test_rehydrate_garbage_is_ignored() {
        let store = MemoryStore::new();
        store.set(keys::UNDO_STACK, "not json at all").unwrap();
        let mut history = DesignHistory::default();
        history.rehydrate(&store, Size::new(1.0, 1.0));
        assert!(!history.can_undo());
    }
}
