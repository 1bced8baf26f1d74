use crate::errors::DraftError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MOOD_SCORE: u8 = 5;
pub const DEFAULT_SLEEP_HOURS: f32 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Helpfulness {
    #[serde(rename = "not helpful")]
    NotHelpful,
    #[serde(rename = "somewhat helpful")]
    SomewhatHelpful,
    #[serde(rename = "very helpful")]
    VeryHelpful,
}

/// Which rating field a category's items carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingKind {
    None,
    Severity,
    Effectiveness,
    Quality,
    Impact,
}

impl fmt::Display for RatingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingKind::None => write!(f, "no"),
            RatingKind::Severity => write!(f, "severity"),
            RatingKind::Effectiveness => write!(f, "effectiveness"),
            RatingKind::Quality => write!(f, "quality"),
            RatingKind::Impact => write!(f, "impact"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Rating {
    Severity(Severity),
    Effectiveness(Helpfulness),
    Quality(Helpfulness),
    Impact(Helpfulness),
}

impl Rating {
    pub fn kind(&self) -> RatingKind {
        match self {
            Rating::Severity(_) => RatingKind::Severity,
            Rating::Effectiveness(_) => RatingKind::Effectiveness,
            Rating::Quality(_) => RatingKind::Quality,
            Rating::Impact(_) => RatingKind::Impact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Medications,
    Behaviors,
    Skills,
    Social,
    SelfCare,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Medications,
        Category::Behaviors,
        Category::Skills,
        Category::Social,
        Category::SelfCare,
    ];

    pub fn rating_kind(self) -> RatingKind {
        match self {
            Category::Medications => RatingKind::None,
            Category::Behaviors => RatingKind::Severity,
            Category::Skills => RatingKind::Effectiveness,
            Category::Social => RatingKind::Quality,
            Category::SelfCare => RatingKind::Impact,
        }
    }

    pub fn items_key(self) -> FormStateKey {
        match self {
            Category::Medications => FormStateKey::Medications,
            Category::Behaviors => FormStateKey::Behaviors,
            Category::Skills => FormStateKey::Skills,
            Category::Social => FormStateKey::Social,
            Category::SelfCare => FormStateKey::SelfCare,
        }
    }

    /// Checks a whole item list against this category's rules.
    pub fn validate_items(self, items: &[TrackingItem]) -> Result<(), DraftError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if item.name.trim().is_empty() {
                return Err(DraftError::EmptyItemName);
            }
            if !seen.insert(item.id.as_str()) {
                return Err(DraftError::DuplicateItem {
                    category: self,
                    id: item.id.clone(),
                });
            }
            for found in item.rating_kinds() {
                if found != self.rating_kind() {
                    return Err(DraftError::RatingKindMismatch {
                        category: self,
                        expected: self.rating_kind(),
                        found,
                    });
                }
                if !item.completed {
                    return Err(DraftError::ItemNotCompleted {
                        category: self,
                        id: item.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Medications => write!(f, "medications"),
            Category::Behaviors => write!(f, "behaviors"),
            Category::Skills => write!(f, "skills"),
            Category::Social => write!(f, "social"),
            Category::SelfCare => write!(f, "selfCare"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<Helpfulness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Helpfulness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<Helpfulness>,
}

impl TrackingItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            completed: false,
            severity: None,
            effectiveness: None,
            quality: None,
            impact: None,
        }
    }

    pub fn rating_kinds(&self) -> Vec<RatingKind> {
        let mut kinds = Vec::new();
        if self.severity.is_some() {
            kinds.push(RatingKind::Severity);
        }
        if self.effectiveness.is_some() {
            kinds.push(RatingKind::Effectiveness);
        }
        if self.quality.is_some() {
            kinds.push(RatingKind::Quality);
        }
        if self.impact.is_some() {
            kinds.push(RatingKind::Impact);
        }
        kinds
    }

    pub fn has_rating(&self) -> bool {
        !self.rating_kinds().is_empty()
    }

    pub fn clear_ratings(&mut self) {
        self.severity = None;
        self.effectiveness = None;
        self.quality = None;
        self.impact = None;
    }

    pub fn apply_rating(&mut self, rating: Rating) {
        match rating {
            Rating::Severity(value) => self.severity = Some(value),
            Rating::Effectiveness(value) => self.effectiveness = Some(value),
            Rating::Quality(value) => self.quality = Some(value),
            Rating::Impact(value) => self.impact = Some(value),
        }
    }
}

/// Names of the `FormState` fields, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormStateKey {
    MoodScore,
    IsBipolarMode,
    MoodNotes,
    SleepHours,
    SleepNotes,
    Medications,
    MedicationNotes,
    Behaviors,
    BehaviorNotes,
    Skills,
    SkillNotes,
    Social,
    SocialNotes,
    SelfCare,
    SelfCareNotes,
    Initialized,
}

impl FormStateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FormStateKey::MoodScore => "moodScore",
            FormStateKey::IsBipolarMode => "isBipolarMode",
            FormStateKey::MoodNotes => "moodNotes",
            FormStateKey::SleepHours => "sleepHours",
            FormStateKey::SleepNotes => "sleepNotes",
            FormStateKey::Medications => "medications",
            FormStateKey::MedicationNotes => "medicationNotes",
            FormStateKey::Behaviors => "behaviors",
            FormStateKey::BehaviorNotes => "behaviorNotes",
            FormStateKey::Skills => "skills",
            FormStateKey::SkillNotes => "skillNotes",
            FormStateKey::Social => "social",
            FormStateKey::SocialNotes => "socialNotes",
            FormStateKey::SelfCare => "selfCare",
            FormStateKey::SelfCareNotes => "selfCareNotes",
            FormStateKey::Initialized => "initialized",
        }
    }
}

impl fmt::Display for FormStateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormStateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown form field '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormState {
    pub mood_score: u8,
    pub is_bipolar_mode: bool,
    pub mood_notes: String,
    pub sleep_hours: f32,
    pub sleep_notes: String,
    pub medications: Vec<TrackingItem>,
    pub medication_notes: String,
    pub behaviors: Vec<TrackingItem>,
    pub behavior_notes: String,
    pub skills: Vec<TrackingItem>,
    pub skill_notes: String,
    pub social: Vec<TrackingItem>,
    pub social_notes: String,
    pub self_care: Vec<TrackingItem>,
    pub self_care_notes: String,
    pub initialized: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            mood_score: DEFAULT_MOOD_SCORE,
            is_bipolar_mode: false,
            mood_notes: String::new(),
            sleep_hours: DEFAULT_SLEEP_HOURS,
            sleep_notes: String::new(),
            medications: Vec::new(),
            medication_notes: String::new(),
            behaviors: Vec::new(),
            behavior_notes: String::new(),
            skills: Vec::new(),
            skill_notes: String::new(),
            social: Vec::new(),
            social_notes: String::new(),
            self_care: Vec::new(),
            self_care_notes: String::new(),
            initialized: false,
        }
    }
}

impl FormState {
    pub fn items(&self, category: Category) -> &[TrackingItem] {
        match category {
            Category::Medications => &self.medications,
            Category::Behaviors => &self.behaviors,
            Category::Skills => &self.skills,
            Category::Social => &self.social,
            Category::SelfCare => &self.self_care,
        }
    }

    /// Copies one field's value from `other` into `self`.
    pub fn copy_field(&mut self, other: &FormState, key: FormStateKey) {
        match key {
            FormStateKey::MoodScore => self.mood_score = other.mood_score,
            FormStateKey::IsBipolarMode => self.is_bipolar_mode = other.is_bipolar_mode,
            FormStateKey::MoodNotes => self.mood_notes = other.mood_notes.clone(),
            FormStateKey::SleepHours => self.sleep_hours = other.sleep_hours,
            FormStateKey::SleepNotes => self.sleep_notes = other.sleep_notes.clone(),
            FormStateKey::Medications => self.medications = other.medications.clone(),
            FormStateKey::MedicationNotes => {
                self.medication_notes = other.medication_notes.clone()
            }
            FormStateKey::Behaviors => self.behaviors = other.behaviors.clone(),
            FormStateKey::BehaviorNotes => self.behavior_notes = other.behavior_notes.clone(),
            FormStateKey::Skills => self.skills = other.skills.clone(),
            FormStateKey::SkillNotes => self.skill_notes = other.skill_notes.clone(),
            FormStateKey::Social => self.social = other.social.clone(),
            FormStateKey::SocialNotes => self.social_notes = other.social_notes.clone(),
            FormStateKey::SelfCare => self.self_care = other.self_care.clone(),
            FormStateKey::SelfCareNotes => self.self_care_notes = other.self_care_notes.clone(),
            FormStateKey::Initialized => self.initialized = other.initialized,
        }
    }
}

/// A single-field change to a `FormState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldUpdate {
    MoodScore(u8),
    IsBipolarMode(bool),
    MoodNotes(String),
    SleepHours(f32),
    SleepNotes(String),
    Medications(Vec<TrackingItem>),
    MedicationNotes(String),
    Behaviors(Vec<TrackingItem>),
    BehaviorNotes(String),
    Skills(Vec<TrackingItem>),
    SkillNotes(String),
    Social(Vec<TrackingItem>),
    SocialNotes(String),
    SelfCare(Vec<TrackingItem>),
    SelfCareNotes(String),
    Initialized(bool),
}

impl FieldUpdate {
    pub fn items(category: Category, items: Vec<TrackingItem>) -> Self {
        match category {
            Category::Medications => FieldUpdate::Medications(items),
            Category::Behaviors => FieldUpdate::Behaviors(items),
            Category::Skills => FieldUpdate::Skills(items),
            Category::Social => FieldUpdate::Social(items),
            Category::SelfCare => FieldUpdate::SelfCare(items),
        }
    }

    pub fn key(&self) -> FormStateKey {
        match self {
            FieldUpdate::MoodScore(_) => FormStateKey::MoodScore,
            FieldUpdate::IsBipolarMode(_) => FormStateKey::IsBipolarMode,
            FieldUpdate::MoodNotes(_) => FormStateKey::MoodNotes,
            FieldUpdate::SleepHours(_) => FormStateKey::SleepHours,
            FieldUpdate::SleepNotes(_) => FormStateKey::SleepNotes,
            FieldUpdate::Medications(_) => FormStateKey::Medications,
            FieldUpdate::MedicationNotes(_) => FormStateKey::MedicationNotes,
            FieldUpdate::Behaviors(_) => FormStateKey::Behaviors,
            FieldUpdate::BehaviorNotes(_) => FormStateKey::BehaviorNotes,
            FieldUpdate::Skills(_) => FormStateKey::Skills,
            FieldUpdate::SkillNotes(_) => FormStateKey::SkillNotes,
            FieldUpdate::Social(_) => FormStateKey::Social,
            FieldUpdate::SocialNotes(_) => FormStateKey::SocialNotes,
            FieldUpdate::SelfCare(_) => FormStateKey::SelfCare,
            FieldUpdate::SelfCareNotes(_) => FormStateKey::SelfCareNotes,
            FieldUpdate::Initialized(_) => FormStateKey::Initialized,
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        match self {
            FieldUpdate::MoodScore(score) if !(1..=10).contains(score) => {
                Err(DraftError::MoodScoreOutOfRange(*score))
            }
            FieldUpdate::SleepHours(hours) if !hours.is_finite() || !(0.0..=24.0).contains(hours) => {
                Err(DraftError::SleepHoursOutOfRange(*hours))
            }
            FieldUpdate::Medications(items) => Category::Medications.validate_items(items),
            FieldUpdate::Behaviors(items) => Category::Behaviors.validate_items(items),
            FieldUpdate::Skills(items) => Category::Skills.validate_items(items),
            FieldUpdate::Social(items) => Category::Social.validate_items(items),
            FieldUpdate::SelfCare(items) => Category::SelfCare.validate_items(items),
            _ => Ok(()),
        }
    }

    pub fn apply(self, form: &mut FormState) {
        match self {
            FieldUpdate::MoodScore(value) => form.mood_score = value,
            FieldUpdate::IsBipolarMode(value) => form.is_bipolar_mode = value,
            FieldUpdate::MoodNotes(value) => form.mood_notes = value,
            FieldUpdate::SleepHours(value) => form.sleep_hours = value,
            FieldUpdate::SleepNotes(value) => form.sleep_notes = value,
            FieldUpdate::Medications(value) => form.medications = value,
            FieldUpdate::MedicationNotes(value) => form.medication_notes = value,
            FieldUpdate::Behaviors(value) => form.behaviors = value,
            FieldUpdate::BehaviorNotes(value) => form.behavior_notes = value,
            FieldUpdate::Skills(value) => form.skills = value,
            FieldUpdate::SkillNotes(value) => form.skill_notes = value,
            FieldUpdate::Social(value) => form.social = value,
            FieldUpdate::SocialNotes(value) => form.social_notes = value,
            FieldUpdate::SelfCare(value) => form.self_care = value,
            FieldUpdate::SelfCareNotes(value) => form.self_care_notes = value,
            FieldUpdate::Initialized(value) => form.initialized = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub submitted_at: DateTime<Utc>,
    pub form: FormState,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    pub entries: BTreeMap<String, MoodEntry>,
}

#[derive(Debug, Deserialize)]
pub struct NewItemRequest {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct DebounceParams {
    #[serde(default)]
    pub debounce: bool,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub mood_score: Option<u8>,
    pub sleep_hours: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub days_logged: u8,
    pub avg_mood: Option<f64>,
    pub avg_sleep: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MoodImproving,
    MoodDeclining,
    ShortSleepLowersMood,
    TopSkill,
}

#[derive(Debug, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub last_7_days: Vec<DailyPoint>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
    pub insights: Vec<Insight>,
}
