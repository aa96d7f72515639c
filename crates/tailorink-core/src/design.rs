//! Designs and the multi-design aggregate.
//!
//! A [`Design`] is one printable side of a garment. The [`DesignAggregate`]
//! holds every side of one product in progress and keeps at most one of them
//! active.

use crate::scene::ObjectKind;
use crate::scene::SceneObject;
use crate::storage::{LocalStore, StorageResult, keys, remove_all};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Opaque design identifier, stable across saves.
pub type DesignId = String;

/// Design errors.
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("Design not found: {0}")]
    NotFound(DesignId),
    #[error("No active design")]
    NoActiveDesign,
    #[error("Single-active invariant violated: {0} active designs")]
    MultipleActive(usize),
}

/// Garment side a design prints on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApparelSide {
    Front,
    Back,
    LeftShoulder,
    RightShoulder,
    LeftSleeve,
    RightSleeve,
    Other(String),
}

impl ApparelSide {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "front" => ApparelSide::Front,
            "back" => ApparelSide::Back,
            "leftshoulder" => ApparelSide::LeftShoulder,
            "rightshoulder" => ApparelSide::RightShoulder,
            "leftsleeve" => ApparelSide::LeftSleeve,
            "rightsleeve" => ApparelSide::RightSleeve,
            _ => ApparelSide::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ApparelSide::Front => "front",
            ApparelSide::Back => "back",
            ApparelSide::LeftShoulder => "leftshoulder",
            ApparelSide::RightShoulder => "rightshoulder",
            ApparelSide::LeftSleeve => "leftsleeve",
            ApparelSide::RightSleeve => "rightsleeve",
            ApparelSide::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ApparelSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ApparelSide {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApparelSide {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(ApparelSide::parse(&value))
    }
}

/// Apparel template image and placement metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apparel {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<ApparelSide>,
    pub color: String,
    pub width: f64,
    pub height: f64,
}

impl Apparel {
    pub fn new(url: impl Into<String>, side: ApparelSide, width: f64, height: f64) -> Self {
        Self {
            url: url.into(),
            side: Some(side),
            color: "#ffffff".to_string(),
            width,
            height,
        }
    }
}

/// Last applied text styling, kept for text-tool continuity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    pub font_family: String,
    pub font_size: f64,
    pub fill: String,
    pub text_align: String,
    #[serde(default = "default_font_weight")]
    pub font_weight: String,
    #[serde(default = "default_font_style")]
    pub font_style: String,
    #[serde(default)]
    pub underline: bool,
}

fn default_font_weight() -> String {
    "normal".to_string()
}

fn default_font_style() -> String {
    "normal".to_string()
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 24.0,
            fill: "#000000".to_string(),
            text_align: "left".to_string(),
            font_weight: default_font_weight(),
            font_style: default_font_style(),
            underline: false,
        }
    }
}

impl TextProps {
    /// Read the current text style off a text object. Returns `None` for
    /// non-text objects; missing attributes fall back to defaults.
    pub fn from_object(object: &SceneObject) -> Option<Self> {
        if !matches!(object.kind, ObjectKind::Text | ObjectKind::IText | ObjectKind::Textbox) {
            return None;
        }
        let defaults = Self::default();
        Some(Self {
            font_family: object.font_family.clone().unwrap_or(defaults.font_family),
            font_size: object.font_size.unwrap_or(defaults.font_size),
            fill: object.fill.clone().unwrap_or(defaults.fill),
            text_align: object.text_align.clone().unwrap_or(defaults.text_align),
            font_weight: object.font_weight.clone().unwrap_or(defaults.font_weight),
            font_style: object.font_style.clone().unwrap_or(defaults.font_style),
            underline: object.underline.unwrap_or(defaults.underline),
        })
    }

    /// Write this style onto a text object.
    pub fn apply_to(&self, object: &mut SceneObject) {
        object.font_family = Some(self.font_family.clone());
        object.font_size = Some(self.font_size);
        object.fill = Some(self.fill.clone());
        object.text_align = Some(self.text_align.clone());
        object.font_weight = Some(self.font_weight.clone());
        object.font_style = Some(self.font_style.clone());
        object.underline = Some(self.underline);
    }
}

/// A user-supplied source image attached to a design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub name: String,
    pub data_url: String,
}

/// One printable side of a garment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    pub id: DesignId,
    pub apparel: Apparel,
    /// Serialized scene snapshot; empty string for an empty scene.
    #[serde(default)]
    pub json_design: String,
    /// PNG render as a data URL; `None` when the scene is empty.
    #[serde(default)]
    pub png_image: Option<String>,
    /// SVG render; `None` when the scene is empty.
    #[serde(default)]
    pub svg_image: Option<String>,
    #[serde(default)]
    pub uploaded_images: Vec<UploadedImage>,
    #[serde(default)]
    pub isactive: bool,
    #[serde(default)]
    pub text_props: TextProps,
}

impl Design {
    /// A new, empty, inactive design for `apparel`.
    pub fn new(apparel: Apparel) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            apparel,
            json_design: String::new(),
            png_image: None,
            svg_image: None,
            uploaded_images: Vec::new(),
            isactive: false,
            text_props: TextProps::default(),
        }
    }

    /// The side name, if any.
    pub fn side(&self) -> Option<&str> {
        self.apparel.side.as_ref().map(ApparelSide::as_str)
    }

    /// Whether the design has printable content.
    pub fn has_content(&self) -> bool {
        self.png_image.is_some()
    }
}

/// Composite editor state persisted on-device and sent with cart lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignState {
    #[serde(default)]
    pub cart: Vec<serde_json::Value>,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub apparels: Vec<Apparel>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub canvas_json: String,
    #[serde(default)]
    pub active_design: Option<DesignId>,
    #[serde(default)]
    pub designs: Vec<Design>,
}

/// Ordered list of designs for one product in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignAggregate {
    designs: Vec<Design>,
}

impl DesignAggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an aggregate from existing designs, repairing the active flags
    /// if more than one is set (the first active one wins).
    pub fn from_designs(mut designs: Vec<Design>) -> Self {
        let mut seen_active = false;
        for design in &mut designs {
            if design.isactive {
                if seen_active {
                    log::warn!("Clearing extra active flag on design {}", design.id);
                    design.isactive = false;
                }
                seen_active = true;
            }
        }
        if !seen_active {
            if let Some(first) = designs.first_mut() {
                first.isactive = true;
            }
        }
        Self { designs }
    }

    pub fn designs(&self) -> &[Design] {
        &self.designs
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Design> {
        self.designs.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Design> {
        self.designs.iter_mut().find(|d| d.id == id)
    }

    /// The active design.
    pub fn active(&self) -> Option<&Design> {
        self.designs.iter().find(|d| d.isactive)
    }

    pub fn active_mut(&mut self) -> Option<&mut Design> {
        self.designs.iter_mut().find(|d| d.isactive)
    }

    /// Append a design for a new side. The first design becomes active.
    pub fn add_design(&mut self, apparel: Apparel) -> DesignId {
        let mut design = Design::new(apparel);
        design.isactive = self.active().is_none();
        let id = design.id.clone();
        self.designs.push(design);
        id
    }

    /// Replace the active design's apparel, snapshot and renders in place.
    /// Which design is active does not change.
    pub fn store_design(
        &mut self,
        apparel: Apparel,
        json_design: String,
        png_image: Option<String>,
        svg_image: Option<String>,
    ) -> Result<(), DesignError> {
        let design = self.active_mut().ok_or(DesignError::NoActiveDesign)?;
        design.apparel = apparel;
        design.json_design = json_design;
        design.png_image = png_image;
        design.svg_image = svg_image;
        Ok(())
    }

    /// Make `target` the only active design. An unknown target leaves the
    /// aggregate unchanged.
    pub fn switch_design(&mut self, target: &str) -> Result<(), DesignError> {
        if self.get(target).is_none() {
            return Err(DesignError::NotFound(target.to_string()));
        }
        for design in &mut self.designs {
            design.isactive = design.id == target;
        }
        Ok(())
    }

    /// Propagate a garment color change to the active design.
    pub fn update_apparel_color(&mut self, color: &str) -> Result<(), DesignError> {
        let design = self.active_mut().ok_or(DesignError::NoActiveDesign)?;
        design.apparel.color = color.to_string();
        Ok(())
    }

    /// Record the last applied text style on the active design.
    pub fn update_text_props(&mut self, props: TextProps) -> Result<(), DesignError> {
        let design = self.active_mut().ok_or(DesignError::NoActiveDesign)?;
        design.text_props = props;
        Ok(())
    }

    /// Attach an uploaded source image to the active design.
    pub fn attach_upload(&mut self, image: UploadedImage) -> Result<(), DesignError> {
        let design = self.active_mut().ok_or(DesignError::NoActiveDesign)?;
        design.uploaded_images.push(image);
        Ok(())
    }

    /// Empty the aggregate and clear persisted editor state.
    ///
    /// The in-memory aggregate is always cleared; a storage failure is
    /// reported after the fact.
    pub fn clear_all(&mut self, store: &dyn LocalStore) -> StorageResult<()> {
        self.designs.clear();
        remove_all(
            store,
            &[keys::SAVED_DESIGN_STATE, keys::SAVED_PROPS_STATE, keys::DESIGN_STATE, keys::CART_ID],
        )
    }

    /// Replace the contents wholesale (e.g. when resuming a cart line).
    pub fn replace(&mut self, designs: Vec<Design>) {
        *self = Self::from_designs(designs);
    }

    /// Designs with printable content, in aggregate order.
    pub fn valid_designs(&self) -> Vec<&Design> {
        self.designs.iter().filter(|d| d.has_content()).collect()
    }

    /// Verify the single-active invariant: exactly one active design, or
    /// none when the aggregate is empty.
    pub fn check_invariant(&self) -> Result<(), DesignError> {
        let active = self.designs.iter().filter(|d| d.isactive).count();
        match (active, self.designs.is_empty()) {
            (0, true) | (1, false) => Ok(()),
            (0, false) => Err(DesignError::NoActiveDesign),
            (n, _) => Err(DesignError::MultipleActive(n)),
        }
    }

    /// Composite state for persistence and cart submission.
    pub fn to_state(
        &self,
        background_color: &str,
        canvas_json: &str,
        colors: &[String],
    ) -> DesignState {
        DesignState {
            cart: Vec::new(),
            background_color: background_color.to_string(),
            apparels: self.designs.iter().map(|d| d.apparel.clone()).collect(),
            colors: colors.to_vec(),
            canvas_json: canvas_json.to_string(),
            active_design: self.active().map(|d| d.id.clone()),
            designs: self.designs.clone(),
        }
    }

    /// Rebuild from a persisted composite state.
    pub fn from_state(state: &DesignState) -> Self {
        let mut aggregate = Self::from_designs(state.designs.clone());
        if let Some(active) = state.active_design.as_deref() {
            if aggregate.switch_design(active).is_err() {
                log::warn!("Persisted active design {} is not in the aggregate", active);
            }
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn apparel(side: ApparelSide) -> Apparel {
        Apparel::new("https://cdn.example.com/tee.png", side, 500.0, 600.0)
    }

    fn aggregate_with(sides: &[ApparelSide]) -> (DesignAggregate, Vec<DesignId>) {
        let mut aggregate = DesignAggregate::new();
        let ids = sides.iter().map(|s| aggregate.add_design(apparel(s.clone()))).collect();
        (aggregate, ids)
    }

    #[test]
    fn test_first_design_is_active() {
        let (aggregate, ids) = aggregate_with(&[ApparelSide::Front, ApparelSide::Back]);
        assert_eq!(aggregate.active().unwrap().id, ids[0]);
        aggregate.check_invariant().unwrap();
    }

    #[test]
    fn test_switch_design() {
        let (mut aggregate, ids) =
            aggregate_with(&[ApparelSide::Front, ApparelSide::Back, ApparelSide::LeftSleeve]);
        aggregate.switch_design(&ids[2]).unwrap();
        assert_eq!(aggregate.active().unwrap().id, ids[2]);
        assert_eq!(aggregate.designs().iter().filter(|d| d.isactive).count(), 1);
    }

    #[test]
    fn test_switch_unknown_design_is_noop() {
        let (mut aggregate, ids) = aggregate_with(&[ApparelSide::Front, ApparelSide::Back]);
        let result = aggregate.switch_design("missing");
        assert!(matches!(result, Err(DesignError::NotFound(_))));
        assert_eq!(aggregate.active().unwrap().id, ids[0]);
    }

    #[test]
    fn test_store_design_keeps_active() {
        let (mut aggregate, ids) = aggregate_with(&[ApparelSide::Front, ApparelSide::Back]);
        aggregate.switch_design(&ids[1]).unwrap();

        let mut new_apparel = apparel(ApparelSide::Back);
        new_apparel.color = "#222222".to_string();
        aggregate
            .store_design(
                new_apparel,
                "{\"objects\":[]}".to_string(),
                Some("data:png".into()),
                None,
            )
            .unwrap();

        let active = aggregate.active().unwrap();
        assert_eq!(active.id, ids[1]);
        assert_eq!(active.apparel.color, "#222222");
        assert_eq!(active.png_image.as_deref(), Some("data:png"));
        assert!(aggregate.get(&ids[0]).unwrap().png_image.is_none());
    }

    #[test]
    fn test_store_design_without_active() {
        let mut aggregate = DesignAggregate::new();
        let result = aggregate.store_design(apparel(ApparelSide::Front), String::new(), None, None);
        assert!(matches!(result, Err(DesignError::NoActiveDesign)));
    }

    #[test]
    fn test_single_active_over_operation_sequence() {
        let store = MemoryStore::new();
        let (mut aggregate, ids) =
            aggregate_with(&[ApparelSide::Front, ApparelSide::Back, ApparelSide::RightShoulder]);

        // A deterministic mix of switch/store/clear operations.
        for step in 0..60usize {
            match step % 7 {
                0..=3 => {
                    let _ = aggregate.switch_design(&ids[step % ids.len()]);
                }
                4 | 5 => {
                    let _ = aggregate.store_design(
                        apparel(ApparelSide::Front),
                        format!("{{\"step\":{}}}", step),
                        None,
                        None,
                    );
                }
                _ => {
                    let _ = aggregate.switch_design("unknown");
                }
            }
            let active = aggregate.designs().iter().filter(|d| d.isactive).count();
            assert!(active <= 1, "step {} left {} active designs", step, active);
            aggregate.check_invariant().unwrap();
        }

        aggregate.clear_all(&store).unwrap();
        assert!(aggregate.is_empty());
        aggregate.check_invariant().unwrap();
    }

    #[test]
    fn test_clear_all_removes_persisted_state() {
        let store = MemoryStore::new();
        store.set(keys::SAVED_DESIGN_STATE, "{}").unwrap();
        store.set(keys::SAVED_PROPS_STATE, "{}").unwrap();
        store.set(keys::CART_ID, "\"line-1\"").unwrap();
        store.set("unrelated", "1").unwrap();

        let (mut aggregate, _) = aggregate_with(&[ApparelSide::Front]);
        aggregate.clear_all(&store).unwrap();

        assert!(aggregate.is_empty());
        assert_eq!(store.keys().unwrap(), vec!["unrelated".to_string()]);
    }

    #[test]
    fn test_update_apparel_color() {
        let (mut aggregate, ids) = aggregate_with(&[ApparelSide::Front, ApparelSide::Back]);
        aggregate.update_apparel_color("#ff00ff").unwrap();
        assert_eq!(aggregate.get(&ids[0]).unwrap().apparel.color, "#ff00ff");
        assert_eq!(aggregate.get(&ids[1]).unwrap().apparel.color, "#ffffff");
    }

    #[test]
    fn test_valid_designs_preserve_order() {
        let (mut aggregate, ids) =
            aggregate_with(&[ApparelSide::Front, ApparelSide::Back, ApparelSide::LeftSleeve]);
        aggregate.get_mut(&ids[0]).unwrap().png_image = Some("a".into());
        aggregate.get_mut(&ids[2]).unwrap().png_image = Some("c".into());

        let valid: Vec<&str> = aggregate.valid_designs().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(valid, vec![ids[0].as_str(), ids[2].as_str()]);
    }

    #[test]
    fn test_from_designs_repairs_active_flags() {
        let mut a = Design::new(apparel(ApparelSide::Front));
        let mut b = Design::new(apparel(ApparelSide::Back));
        a.isactive = true;
        b.isactive = true;
        let aggregate = DesignAggregate::from_designs(vec![a.clone(), b]);
        assert_eq!(aggregate.active().unwrap().id, a.id);
        aggregate.check_invariant().unwrap();
    }

    #[test]
    fn test_state_round_trip() {
        let (mut aggregate, ids) = aggregate_with(&[ApparelSide::Front, ApparelSide::Back]);
        aggregate.switch_design(&ids[1]).unwrap();

        let state = aggregate.to_state("#ffffff", "", &["#ff0000".to_string()]);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"backgroundColor\""));
        assert!(json.contains("\"activeDesign\""));
        assert!(json.contains("\"jsonDesign\""));

        let parsed: DesignState = serde_json::from_str(&json).unwrap();
        let restored = DesignAggregate::from_state(&parsed);
        assert_eq!(restored, aggregate);
    }

    #[test]
    fn test_side_wire_format() {
        let json = serde_json::to_string(&apparel(ApparelSide::LeftShoulder)).unwrap();
        assert!(json.contains("\"side\":\"leftshoulder\""));

        let parsed: Apparel = serde_json::from_str(
            r##"{"url":"u","side":"collar","color":"#000","width":1,"height":1}"##,
        )
        .unwrap();
        assert_eq!(parsed.side, Some(ApparelSide::Other("collar".to_string())));

        let no_side: Apparel =
            serde_json::from_str(r##"{"url":"u","color":"#000","width":1,"height":1}"##).unwrap();
        assert!(no_side.side.is_none());
    }

    #[test]
    fn test_text_props_from_object() {
        let mut text = SceneObject::text(0.0, 0.0, "Hello", 30.0);
        text.fill = Some("#123456".into());
        let props = TextProps::from_object(&text).unwrap();
        assert_eq!(props.font_size, 30.0);
        assert_eq!(props.fill, "#123456");
        assert_eq!(props.font_family, "Arial");

        assert!(TextProps::from_object(&SceneObject::rect(0.0, 0.0, 1.0, 1.0)).is_none());
    }
}
