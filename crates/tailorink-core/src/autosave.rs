//! Debounced auto-save of the active design.
//!
//! Each watched surface event pushes the save deadline out by the quiet
//! period. When the deadline passes the surface is serialized and, if it
//! changed since the last capture, rendered and stored on the active design.
//! Callers pass the current [`Instant`] in so the schedule is deterministic.

use crate::design::DesignAggregate;
use crate::scene::{Surface, SurfaceEvent, SurfaceEventKind, png_data_url};
use std::time::{Duration, Instant};

/// Default quiet period before a save.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Auto-save scheduler for one surface.
#[derive(Debug, Clone)]
pub struct AutoSaveDebouncer {
    quiet: Duration,
    png_multiplier: u32,
    /// When the pending save fires, if one is scheduled.
    deadline: Option<Instant>,
    /// Serialized snapshot written by the last save.
    last_captured: Option<String>,
}

impl Default for AutoSaveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, 4)
    }
}

impl AutoSaveDebouncer {
    pub fn new(quiet: Duration, png_multiplier: u32) -> Self {
        Self {
            quiet,
            png_multiplier,
            deadline: None,
            last_captured: None,
        }
    }

    /// Whether `kind` restarts the timer.
    pub fn watches(kind: SurfaceEventKind) -> bool {
        matches!(
            kind,
            SurfaceEventKind::ObjectModified
                | SurfaceEventKind::ObjectMoving
                | SurfaceEventKind::ObjectScaling
                | SurfaceEventKind::ObjectRotating
        )
    }

    /// Feed a surface event. Returns true if it (re)scheduled a save.
    pub fn on_event(&mut self, event: &SurfaceEvent, now: Instant) -> bool {
        if Self::watches(event.kind) {
            self.schedule(now);
            true
        } else {
            false
        }
    }

    /// Restart the timer from `now`. Last write wins.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Drop any pending save.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Record `json` as already saved, e.g. after mounting a stored design.
    pub fn set_marker(&mut self, json: Option<String>) {
        self.last_captured = json;
    }

    /// Run the pending save if its deadline has passed.
    pub fn tick(
        &mut self,
        now: Instant,
        surface: &dyn Surface,
        aggregate: &mut DesignAggregate,
    ) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.deadline = None;
        self.flush(surface, aggregate)
    }

    /// Save now, regardless of the timer. Returns true if the active design
    /// was updated.
    ///
    /// An unchanged surface is skipped. Failures are logged and the save
    /// is dropped.
    pub fn flush(&mut self, surface: &dyn Surface, aggregate: &mut DesignAggregate) -> bool {
        self.deadline = None;
        if surface.is_disposed() {
            return false;
        }
        let Some(apparel) = aggregate.active().map(|d| d.apparel.clone()) else {
            return false;
        };

        let json = match surface.snapshot().to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Auto-save failed to serialize surface: {}", e);
                return false;
            }
        };
        if self.last_captured.as_deref() == Some(json.as_str()) {
            return false;
        }

        let (json_design, png_image, svg_image) = if surface.is_empty() {
            (String::new(), None, None)
        } else {
            let png = match surface.to_png(self.png_multiplier) {
                Ok(png) => png,
                Err(e) => {
                    log::error!("Auto-save failed to render PNG: {}", e);
                    return false;
                }
            };
            (json.clone(), Some(png_data_url(&png)), Some(surface.to_svg()))
        };

        if let Err(e) = aggregate.store_design(apparel, json_design, png_image, svg_image) {
            log::warn!("Auto-save skipped: {}", e);
            return false;
        }
        log::debug!("Auto-saved active design");
        self.last_captured = Some(json);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Apparel, ApparelSide};
    use crate::scene::{SceneObject, SceneSurface};
    use kurbo::Size;

    fn setup() -> (SceneSurface, DesignAggregate) {
        let surface = SceneSurface::new(Size::new(40.0, 40.0));
        let mut aggregate = DesignAggregate::new();
        aggregate.add_design(Apparel::new("tee.png", ApparelSide::Front, 40.0, 40.0));
        (surface, aggregate)
    }

    fn feed(debouncer: &mut AutoSaveDebouncer, surface: &mut SceneSurface, now: Instant) {
        for event in surface.take_events() {
            debouncer.on_event(&event, now);
        }
    }

    #[test]
    fn test_burst_collapses_to_one_save() {
        let (mut surface, mut aggregate) = setup();
        let id = surface.add_object(SceneObject::rect(0.0, 0.0, 10.0, 10.0).with_fill("#ff0000"));
        surface.take_events();

        let mut debouncer = AutoSaveDebouncer::default();
        let start = Instant::now();
        let mut saves = 0;
        for i in 0..10u64 {
            let now = start + Duration::from_millis(i * 40);
            surface.translate(&id, 1.0, 0.0);
            feed(&mut debouncer, &mut surface, now);
            if debouncer.tick(now, &surface, &mut aggregate) {
                saves += 1;
            }
        }
        assert_eq!(saves, 0);

        let last_event = start + Duration::from_millis(9 * 40);
        assert!(!debouncer.tick(last_event + Duration::from_millis(499), &surface, &mut aggregate));
        assert!(debouncer.tick(last_event + DEFAULT_QUIET_PERIOD, &surface, &mut aggregate));
        saves += 1;
        assert!(!debouncer.tick(last_event + Duration::from_secs(5), &surface, &mut aggregate));

        assert_eq!(saves, 1);
        let stored = aggregate.active().unwrap();
        assert_eq!(stored.json_design, surface.snapshot().to_json().unwrap());
        assert!(stored.json_design.contains("\"left\":10.0"));
        assert!(stored.png_image.as_deref().unwrap().starts_with("data:image/png;base64,"));
        assert!(stored.svg_image.as_deref().unwrap().starts_with("<svg"));
    }

    #[test]
    fn test_unchanged_surface_is_skipped() {
        let (mut surface, mut aggregate) = setup();
        surface.add_object(SceneObject::circle(5.0, 5.0, 3.0).with_fill("#00ff00"));

        let mut debouncer = AutoSaveDebouncer::default();
        assert!(debouncer.flush(&surface, &mut aggregate));
        let first = aggregate.clone();

        assert!(!debouncer.flush(&surface, &mut aggregate));
        assert_eq!(aggregate, first);
    }

    #[test]
    fn test_ignores_unwatched_events() {
        let (mut surface, _) = setup();
        let mut debouncer = AutoSaveDebouncer::default();
        surface.add_object(SceneObject::rect(0.0, 0.0, 1.0, 1.0));
        feed(&mut debouncer, &mut surface, Instant::now());
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel() {
        let (mut surface, mut aggregate) = setup();
        let id = surface.add_object(SceneObject::rect(0.0, 0.0, 1.0, 1.0));
        surface.take_events();
        let mut debouncer = AutoSaveDebouncer::default();
        let now = Instant::now();

        surface.finish_transform(&id);
        feed(&mut debouncer, &mut surface, now);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        assert!(!debouncer.tick(now + Duration::from_secs(1), &surface, &mut aggregate));
        assert!(aggregate.active().unwrap().png_image.is_none());
    }

    #[test]
    fn test_empty_surface_stores_no_renders() {
        let (surface, mut aggregate) = setup();
        aggregate.active_mut().unwrap().png_image = Some("stale".to_string());

        let mut debouncer = AutoSaveDebouncer::default();
        assert!(debouncer.flush(&surface, &mut aggregate));
        let stored = aggregate.active().unwrap();
        assert!(stored.json_design.is_empty());
        assert!(stored.png_image.is_none());
        assert!(stored.svg_image.is_none());
    }

    #[test]
    fn test_no_active_design() {
        let (surface, _) = setup();
        let mut empty = DesignAggregate::new();
        let mut debouncer = AutoSaveDebouncer::default();
        assert!(!debouncer.flush(&surface, &mut empty));
    }
}
