//! Orchestration input.
//!
//! `EventOrchestrationParameters` is the single structured description of an
//! event. It is owned by the caller and never mutated by the pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::template::BudgetCategory;

/// Complete description of the event to design
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOrchestrationParameters {
    pub event: EventFoundation,
    pub culture: CulturalFoundation,
    pub venue: VenueProfile,
    pub guests: GuestDemographics,
    #[serde(default)]
    pub experience: ExperienceGoals,
    #[serde(default)]
    pub technology: TechnologyFlags,
    #[serde(default)]
    pub timing: EventTiming,
    pub budget: BudgetProfile,
    #[serde(default)]
    pub timeline: PlanningTimeline,
    #[serde(default)]
    pub sustainability: SustainabilityLevel,
    #[serde(default)]
    pub accessibility: AccessibilityLevel,
    #[serde(default)]
    pub security: SecurityProfile,
}

impl EventOrchestrationParameters {
    /// Create parameters with defaults for everything but the essentials.
    ///
    /// The venue defaults to a 30 m × 20 m × 5 m indoor hall in summer.
    pub fn new(event_type: EventKind, primary: Culture, guests: u32, budget_total: f64) -> Self {
        Self {
            event: EventFoundation {
                event_type,
                scale: None,
                duration_hours: 5.0,
            },
            culture: CulturalFoundation {
                primary,
                secondary: Vec::new(),
                fusion: false,
                sensitivity: CulturalSensitivity::Standard,
            },
            venue: VenueProfile {
                venue_type: VenueType::Indoor,
                dimensions: VenueDimensions {
                    width: 30.0,
                    depth: 20.0,
                    height: 5.0,
                },
                restrictions: Vec::new(),
                climate: ClimateProfile::default(),
            },
            guests: GuestDemographics {
                total: guests,
                ..Default::default()
            },
            experience: ExperienceGoals::default(),
            technology: TechnologyFlags::default(),
            timing: EventTiming::default(),
            budget: BudgetProfile {
                total: budget_total,
                breakdown: BTreeMap::new(),
                currency: default_currency(),
            },
            timeline: PlanningTimeline::default(),
            sustainability: SustainabilityLevel::default(),
            accessibility: AccessibilityLevel::default(),
            security: SecurityProfile::default(),
        }
    }

    /// Add secondary cultures and mark the event as a fusion
    pub fn with_fusion(mut self, secondary: Vec<Culture>) -> Self {
        self.culture.fusion = !secondary.is_empty();
        self.culture.secondary = secondary;
        self
    }

    /// Replace the venue type and dimensions
    pub fn with_venue(mut self, venue_type: VenueType, width: f64, depth: f64, height: f64) -> Self {
        self.venue.venue_type = venue_type;
        self.venue.dimensions = VenueDimensions {
            width,
            depth,
            height,
        };
        self
    }

    /// Set the atmosphere goal
    pub fn with_atmosphere(mut self, atmosphere: Atmosphere) -> Self {
        self.experience.atmosphere = atmosphere;
        self
    }

    /// Set the season of the venue climate
    pub fn with_season(mut self, season: Season) -> Self {
        self.venue.climate.season = season;
        self
    }

    /// Effective event scale (explicit, or derived from guest count)
    pub fn scale(&self) -> EventScale {
        self.event
            .scale
            .unwrap_or_else(|| event_scale(self.guests.total))
    }

    /// Usable floor area of the venue in square metres
    pub fn usable_area(&self) -> f64 {
        self.venue.dimensions.width.max(0.0) * self.venue.dimensions.depth.max(0.0)
    }

    /// Whether the venue is (partly) exposed to the weather
    pub fn is_outdoor(&self) -> bool {
        matches!(self.venue.venue_type, VenueType::Outdoor)
    }

    /// Check whether a venue restriction applies
    pub fn is_restricted(&self, restriction: VenueRestriction) -> bool {
        self.venue.restrictions.contains(&restriction)
    }
}

/// Derive the event scale from the total guest count
pub fn event_scale(guests: u32) -> EventScale {
    match guests {
        0..=25 => EventScale::Intimate,
        26..=75 => EventScale::Medium,
        76..=150 => EventScale::Large,
        151..=300 => EventScale::Grand,
        _ => EventScale::Monumental,
    }
}

/// What kind of event, how big, how long
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFoundation {
    #[serde(rename = "type")]
    pub event_type: EventKind,
    /// Overrides the scale derived from guest count
    #[serde(default)]
    pub scale: Option<EventScale>,
    #[serde(default = "default_duration_hours")]
    pub duration_hours: f64,
}

fn default_duration_hours() -> f64 {
    5.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Wedding,
    Corporate,
    Conference,
    Birthday,
    Gala,
    Cultural,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Wedding => "wedding",
            EventKind::Corporate => "corporate",
            EventKind::Conference => "conference",
            EventKind::Birthday => "birthday",
            EventKind::Gala => "gala",
            EventKind::Cultural => "cultural",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventScale {
    Intimate,
    Medium,
    Large,
    Grand,
    Monumental,
}

impl fmt::Display for EventScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventScale::Intimate => "intimate",
            EventScale::Medium => "medium",
            EventScale::Large => "large",
            EventScale::Grand => "grand",
            EventScale::Monumental => "monumental",
        };
        f.write_str(name)
    }
}

/// Cultures with built-in design knowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Culture {
    Japanese,
    Scandinavian,
    Italian,
    French,
    Modern,
    Traditional,
}

impl Culture {
    pub const ALL: [Culture; 6] = [
        Culture::Japanese,
        Culture::Scandinavian,
        Culture::Italian,
        Culture::French,
        Culture::Modern,
        Culture::Traditional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Culture::Japanese => "japanese",
            Culture::Scandinavian => "scandinavian",
            Culture::Italian => "italian",
            Culture::French => "french",
            Culture::Modern => "modern",
            Culture::Traditional => "traditional",
        }
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalFoundation {
    pub primary: Culture,
    #[serde(default)]
    pub secondary: Vec<Culture>,
    /// Whether the secondary cultures are meant to be blended in
    #[serde(default)]
    pub fusion: bool,
    #[serde(default)]
    pub sensitivity: CulturalSensitivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CulturalSensitivity {
    Relaxed,
    #[default]
    Standard,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueProfile {
    #[serde(rename = "type")]
    pub venue_type: VenueType,
    pub dimensions: VenueDimensions,
    #[serde(default)]
    pub restrictions: Vec<VenueRestriction>,
    #[serde(default)]
    pub climate: ClimateProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VenueType {
    Indoor,
    Outdoor,
    Hybrid,
}

/// Venue extents in metres (x = width, z = depth, y = height)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenueDimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VenueRestriction {
    NoOpenFlame,
    NoRigging,
    NoAmplifiedSound,
    NoFloorAnchors,
    LimitedPower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateProfile {
    #[serde(default)]
    pub season: Season,
    #[serde(default = "default_temperature")]
    pub temperature_c: f64,
    /// Probability of rain during the event, 0–1
    #[serde(default)]
    pub precipitation_risk: f64,
}

fn default_temperature() -> f64 {
    20.0
}

impl Default for ClimateProfile {
    fn default() -> Self {
        Self {
            season: Season::default(),
            temperature_c: default_temperature(),
            precipitation_risk: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Season {
    Spring,
    #[default]
    Summer,
    Autumn,
    Winter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDemographics {
    pub total: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub elderly: u32,
    #[serde(default)]
    pub wheelchair_users: u32,
    #[serde(default)]
    pub vip: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceGoals {
    #[serde(default)]
    pub atmosphere: Atmosphere,
    #[serde(default)]
    pub interaction: InteractionStyle,
    #[serde(default)]
    pub memorability: Option<MemorabilityGoal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Atmosphere {
    #[default]
    Ceremonial,
    Celebratory,
    Intimate,
    Professional,
    Festive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionStyle {
    Formal,
    #[default]
    Social,
    Participatory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemorabilityGoal {
    Elegant,
    Photogenic,
    ImmersiveExperience,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyFlags {
    #[serde(default)]
    pub audiovisual: bool,
    #[serde(default)]
    pub live_streaming: bool,
    #[serde(default)]
    pub interactive_displays: bool,
    #[serde(default)]
    pub smart_lighting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTiming {
    /// Local start hour, 0–24
    #[serde(default = "default_start_hour")]
    pub start_hour: f64,
    #[serde(default)]
    pub runs_into_night: bool,
}

fn default_start_hour() -> f64 {
    16.0
}

impl Default for EventTiming {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            runs_into_night: false,
        }
    }
}

impl EventTiming {
    /// Whether artificial light carries the event
    pub fn is_evening(&self) -> bool {
        self.runs_into_night || self.start_hour >= 17.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProfile {
    pub total: f64,
    /// Caller's preferred split; amounts, not fractions
    #[serde(default)]
    pub breakdown: BTreeMap<BudgetCategory, f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningTimeline {
    #[serde(default = "default_planning_weeks")]
    pub planning_weeks: u32,
    #[serde(default = "default_setup_hours")]
    pub setup_hours: f64,
    #[serde(default = "default_teardown_hours")]
    pub teardown_hours: f64,
}

fn default_planning_weeks() -> u32 {
    12
}
fn default_setup_hours() -> f64 {
    8.0
}
fn default_teardown_hours() -> f64 {
    4.0
}

impl Default for PlanningTimeline {
    fn default() -> Self {
        Self {
            planning_weeks: default_planning_weeks(),
            setup_hours: default_setup_hours(),
            teardown_hours: default_teardown_hours(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SustainabilityLevel {
    #[default]
    Standard,
    Enhanced,
    Maximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessibilityLevel {
    #[default]
    Basic,
    Enhanced,
    Universal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProfile {
    #[serde(default)]
    pub level: SecurityLevel,
    #[serde(default)]
    pub vip_protection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityLevel {
    Minimal,
    #[default]
    Standard,
    Elevated,
    Maximum,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_scale_boundaries() {
        assert_eq!(event_scale(25), EventScale::Intimate);
        assert_eq!(event_scale(26), EventScale::Medium);
        assert_eq!(event_scale(75), EventScale::Medium);
        assert_eq!(event_scale(76), EventScale::Large);
        assert_eq!(event_scale(150), EventScale::Large);
        assert_eq!(event_scale(151), EventScale::Grand);
        assert_eq!(event_scale(300), EventScale::Grand);
        assert_eq!(event_scale(301), EventScale::Monumental);
    }

    #[test]
    fn test_explicit_scale_overrides_guest_count() {
        let mut params =
            EventOrchestrationParameters::new(EventKind::Gala, Culture::French, 40, 20_000.0);
        assert_eq!(params.scale(), EventScale::Medium);

        params.event.scale = Some(EventScale::Grand);
        assert_eq!(params.scale(), EventScale::Grand);
    }

    #[test]
    fn test_parameters_parse_from_json() {
        let json = r#"{
            "event": { "type": "wedding", "durationHours": 6 },
            "culture": { "primary": "japanese", "secondary": ["scandinavian"], "fusion": true },
            "venue": {
                "type": "outdoor",
                "dimensions": { "width": 40, "depth": 30, "height": 8 },
                "restrictions": ["no-open-flame"],
                "climate": { "season": "spring", "temperatureC": 18 }
            },
            "guests": { "total": 120, "wheelchairUsers": 2 },
            "experience": { "atmosphere": "ceremonial", "memorability": "immersive-experience" },
            "budget": { "total": 80000, "breakdown": { "furniture": 20000 } },
            "security": { "level": "elevated" }
        }"#;

        let params: EventOrchestrationParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.event.event_type, EventKind::Wedding);
        assert_eq!(params.culture.secondary, vec![Culture::Scandinavian]);
        assert!(params.is_outdoor());
        assert!(params.is_restricted(VenueRestriction::NoOpenFlame));
        assert_eq!(params.guests.wheelchair_users, 2);
        assert_eq!(
            params.experience.memorability,
            Some(MemorabilityGoal::ImmersiveExperience)
        );
        assert_eq!(params.budget.breakdown[&BudgetCategory::Furniture], 20000.0);
        assert_eq!(params.budget.currency, "USD");
        assert_eq!(params.security.level, SecurityLevel::Elevated);
        assert_eq!(params.scale(), EventScale::Large);
    }

    #[test]
    fn test_evening_detection() {
        let timing = EventTiming {
            start_hour: 11.0,
            runs_into_night: false,
        };
        assert!(!timing.is_evening());
        assert!(EventTiming {
            start_hour: 19.0,
            runs_into_night: false
        }
        .is_evening());
    }
}
