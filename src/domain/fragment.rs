//! Scene fragments: the composable spatial nodes produced by generators.
//!
//! A fragment has a local transform, an optional material, an opaque tag bag
//! and children. The orchestrator only reads the tags it knows about (see
//! [`tags`]) and never removes or rewrites a tag's meaning; passes add tags or
//! extend array tags.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::template::TemplateId;

/// Well-known tag keys
pub mod tags {
    pub const TYPE: &str = "type";
    pub const DRAGGABLE: &str = "draggable";
    pub const COMPONENT: &str = "component";
    pub const CULTURAL_SIGNIFICANCE: &str = "culturalSignificance";
    pub const ACCESSIBILITY_FEATURES: &str = "accessibilityFeatures";
    pub const CULTURAL_ELEMENTS: &str = "culturalElements";
    pub const ESTIMATED_COST: &str = "estimatedCost";
    /// Index of the anchor fragment (e.g. the table) this fragment belongs to
    pub const ANCHOR_INDEX: &str = "anchorIndex";
    pub const SEAT_INDEX: &str = "seatIndex";
    pub const SEATS_IN_GROUP: &str = "seatsInGroup";
    pub const CONTROL_LINKS: &str = "controlLinks";
    pub const EXPERIENCE_STAGE: &str = "experienceStage";
    pub const SEQUENCE: &str = "sequence";
    pub const EMPHASIS: &str = "emphasis";
    pub const EGRESS_CONFLICT: &str = "egressConflict";
    pub const POWER_WATTS: &str = "powerWatts";
}

/// A point or direction in venue space (metres; y is up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance on the floor plane (ignores height)
    pub fn planar_distance(&self, other: &Vec3) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

/// Local transform of a fragment relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub position: Vec3,
    /// Rotation about the vertical axis, radians
    pub rotation_y: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_y: 0.0,
            scale: 1.0,
        }
    }
}

/// 8-bit RGB color, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim_start_matches('#');
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend toward `other`; `t` is clamped to 0–1
    pub fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2) as u32;
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)
    }

    /// Closest color of a palette, first wins on ties
    pub fn nearest<'a>(&self, palette: &'a [Rgb]) -> Option<&'a Rgb> {
        palette.iter().min_by_key(|c| self.distance_sq(c))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid color '{}'", value))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Surface material of a fragment.
///
/// `base_color` is what the generator chose; `color` is what integration
/// passes derive from it. Passes always recompute `color` from `base_color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSpec {
    pub name: String,
    pub base_color: Rgb,
    pub color: Rgb,
}

impl MaterialSpec {
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            base_color: color,
            color,
        }
    }
}

/// A composable spatial node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFragment {
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialSpec>,
    #[serde(default)]
    pub tags: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneFragment>,
}

impl SceneFragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_material(mut self, material: MaterialSpec) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    pub fn add_child(&mut self, child: SceneFragment) {
        self.children.push(child);
    }

    pub fn set_local_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_tag(&mut self, key: &str, value: impl Into<Value>) {
        self.tags.insert(key.to_string(), value.into());
    }

    pub fn tag(&self, key: &str) -> Option<&Value> {
        self.tags.get(key)
    }

    pub fn tag_str(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(Value::as_str)
    }

    pub fn tag_f64(&self, key: &str) -> Option<f64> {
        self.tags.get(key).and_then(Value::as_f64)
    }

    pub fn tag_u64(&self, key: &str) -> Option<u64> {
        self.tags.get(key).and_then(Value::as_u64)
    }

    pub fn tag_bool(&self, key: &str) -> bool {
        self.tags.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String members of an array tag
    pub fn tag_strings(&self, key: &str) -> Vec<String> {
        match self.tags.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Append `value` to an array tag unless already present.
    ///
    /// A scalar string tag is promoted to a one-element array first.
    /// Returns whether the tag changed.
    pub fn insert_tag_member(&mut self, key: &str, value: &str) -> bool {
        if let Some(Value::String(existing)) = self.tags.get(key) {
            let promoted = Value::Array(vec![Value::String(existing.clone())]);
            self.tags.insert(key.to_string(), promoted);
        }
        let entry = self
            .tags
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => {
                if items.iter().any(|v| v.as_str() == Some(value)) {
                    false
                } else {
                    items.push(Value::String(value.to_string()));
                    true
                }
            }
            _ => false,
        }
    }

    /// Remove `value` from an array tag. Returns whether it was present.
    pub fn remove_tag_member(&mut self, key: &str, value: &str) -> bool {
        match self.tags.get_mut(key) {
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|v| v.as_str() != Some(value));
                items.len() != before
            }
            _ => false,
        }
    }

    /// Visit this fragment and all descendants, depth first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SceneFragment)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Mutable depth-first visit
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut SceneFragment)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }

    /// Number of fragments in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneFragment::node_count).sum::<usize>()
    }
}

/// What a generator returns: one fragment or a set of sibling fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "fragments")]
pub enum TemplateInstance {
    Single(SceneFragment),
    Many(Vec<SceneFragment>),
}

impl TemplateInstance {
    pub fn fragments(&self) -> &[SceneFragment] {
        match self {
            TemplateInstance::Single(fragment) => std::slice::from_ref(fragment),
            TemplateInstance::Many(fragments) => fragments,
        }
    }

    pub fn fragments_mut(&mut self) -> &mut [SceneFragment] {
        match self {
            TemplateInstance::Single(fragment) => std::slice::from_mut(fragment),
            TemplateInstance::Many(fragments) => fragments,
        }
    }

    pub fn into_fragments(self) -> Vec<SceneFragment> {
        match self {
            TemplateInstance::Single(fragment) => vec![fragment],
            TemplateInstance::Many(fragments) => fragments,
        }
    }

    pub fn len(&self) -> usize {
        self.fragments().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments().is_empty()
    }

    /// Visit every fragment of every tree in this instance
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SceneFragment)) {
        for fragment in self.fragments() {
            fragment.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut SceneFragment)) {
        for fragment in self.fragments_mut() {
            fragment.walk_mut(visit);
        }
    }
}

/// Per-run generated content, keyed by template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateInstances {
    instances: IndexMap<TemplateId, TemplateInstance>,
}

impl TemplateInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: TemplateId, instance: TemplateInstance) {
        self.instances.insert(template, instance);
    }

    pub fn get(&self, template: TemplateId) -> Option<&TemplateInstance> {
        self.instances.get(&template)
    }

    pub fn get_mut(&mut self, template: TemplateId) -> Option<&mut TemplateInstance> {
        self.instances.get_mut(&template)
    }

    pub fn contains(&self, template: TemplateId) -> bool {
        self.instances.contains_key(&template)
    }

    pub fn remove(&mut self, template: TemplateId) -> Option<TemplateInstance> {
        self.instances.shift_remove(&template)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Templates in insertion (instantiation) order
    pub fn templates(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.instances.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &TemplateInstance)> {
        self.instances.iter().map(|(t, i)| (*t, i))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TemplateId, &mut TemplateInstance)> {
        self.instances.iter_mut().map(|(t, i)| (*t, i))
    }

    /// Visit every fragment of every template
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(TemplateId, &'a SceneFragment)) {
        for (template, instance) in &self.instances {
            instance.walk(&mut |fragment| visit(*template, fragment));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex_round_trip() {
        let color = Rgb::from_hex("#a1b2c3").unwrap();
        assert_eq!(color, Rgb::new(0xa1, 0xb2, 0xc3));
        assert_eq!(color.to_hex(), "#a1b2c3");
        assert!(Rgb::from_hex("#abc").is_none());

        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#a1b2c3\"");
    }

    #[test]
    fn test_rgb_lerp_and_nearest() {
        let black = Rgb::new(0, 0, 0);
        let white = Rgb::new(255, 255, 255);
        assert_eq!(black.lerp(&white, 0.0), black);
        assert_eq!(black.lerp(&white, 1.0), white);
        assert_eq!(black.lerp(&white, 0.5), Rgb::new(128, 128, 128));

        let palette = [white, Rgb::new(200, 0, 0)];
        assert_eq!(Rgb::new(180, 20, 20).nearest(&palette), Some(&palette[1]));
    }

    #[test]
    fn test_tag_members_are_a_set() {
        let mut fragment = SceneFragment::new("chair");
        assert!(fragment.insert_tag_member(tags::ACCESSIBILITY_FEATURES, "wheelchair-position"));
        assert!(!fragment.insert_tag_member(tags::ACCESSIBILITY_FEATURES, "wheelchair-position"));
        assert_eq!(
            fragment.tag_strings(tags::ACCESSIBILITY_FEATURES),
            vec!["wheelchair-position".to_string()]
        );
        assert!(fragment.remove_tag_member(tags::ACCESSIBILITY_FEATURES, "wheelchair-position"));
        assert!(fragment.tag_strings(tags::ACCESSIBILITY_FEATURES).is_empty());
    }

    #[test]
    fn test_scalar_tag_promoted_to_array() {
        let mut fragment = SceneFragment::new("arch").with_tag(tags::CULTURAL_ELEMENTS, "torii");
        fragment.insert_tag_member(tags::CULTURAL_ELEMENTS, "shimenawa");
        assert_eq!(
            fragment.tag_strings(tags::CULTURAL_ELEMENTS),
            vec!["torii".to_string(), "shimenawa".to_string()]
        );
    }

    #[test]
    fn test_walk_visits_children() {
        let mut root = SceneFragment::new("root");
        let mut child = SceneFragment::new("child");
        child.add_child(SceneFragment::new("grandchild"));
        root.add_child(child);

        let mut names = Vec::new();
        root.walk(&mut |f| names.push(f.name.clone()));
        assert_eq!(names, vec!["root", "child", "grandchild"]);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_instances_keep_insertion_order() {
        let mut instances = TemplateInstances::new();
        instances.insert(TemplateId::Table, TemplateInstance::Many(vec![]));
        instances.insert(TemplateId::Chair, TemplateInstance::Many(vec![]));
        instances.insert(
            TemplateId::Stage,
            TemplateInstance::Single(SceneFragment::new("stage")),
        );

        let order: Vec<_> = instances.templates().collect();
        assert_eq!(order, vec![TemplateId::Table, TemplateId::Chair, TemplateId::Stage]);
        assert_eq!(instances.get(TemplateId::Stage).unwrap().len(), 1);
    }
}
