use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HabitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier handed out by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked habit as held by the store.
///
/// `streak` and `last_completed` are caches over `completions`: the streak is
/// the length of the run of consecutive completed dates ending at
/// `last_completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub streak: u32,
    pub last_completed: Option<NaiveDate>,
    pub completions: BTreeSet<NaiveDate>,
    pub order: Option<i64>,
}

impl Habit {
    pub fn new(name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: HabitId::generate(),
            name,
            created_at,
            streak: 0,
            last_completed: None,
            completions: BTreeSet::new(),
            order: None,
        }
    }

    /// Rebuilds a habit from its stored record. Records without a usable
    /// name are rejected.
    pub fn from_record(id: HabitId, record: HabitRecord) -> Option<Self> {
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return None;
        }

        let completions: BTreeSet<NaiveDate> = record
            .completions
            .into_iter()
            .filter_map(|(date, done)| done.then_some(date))
            .collect();
        let last_completed = record
            .last_completed
            .or_else(|| completions.last().copied());
        let streak = match (record.streak, last_completed) {
            (Some(streak), _) => streak,
            (None, Some(last)) => crate::streak::run_ending_at(&completions, last),
            (None, None) => 0,
        };

        Some(Self {
            id,
            name,
            created_at: record.created_at,
            streak,
            last_completed,
            completions,
            order: record.order,
        })
    }

    /// Every stored field, used for the initial write of a new habit.
    pub fn to_fields(&self) -> HabitFields {
        HabitFields {
            name: Some(self.name.clone()),
            created_at: Some(self.created_at),
            order: self.order,
            ..self.completion_fields()
        }
    }

    /// The fields touched by a completion.
    pub fn completion_fields(&self) -> HabitFields {
        HabitFields {
            streak: Some(self.streak),
            last_completed: self.last_completed,
            completions: Some(self.completions.iter().map(|date| (*date, true)).collect()),
            ..HabitFields::default()
        }
    }
}

/// Wire shape of one habit document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub completions: BTreeMap<NaiveDate, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Partial field set for an upsert. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitFields {
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub streak: Option<u32>,
    pub last_completed: Option<NaiveDate>,
    pub completions: Option<BTreeMap<NaiveDate, bool>>,
    pub order: Option<i64>,
}

impl HabitFields {
    /// Builds a new record; `None` when the required fields are missing.
    pub fn into_record(self) -> Option<HabitRecord> {
        Some(HabitRecord {
            name: self.name?,
            created_at: self.created_at?,
            streak: self.streak,
            last_completed: self.last_completed,
            completions: self.completions.unwrap_or_default(),
            order: self.order,
        })
    }

    pub fn merge_into(self, record: &mut HabitRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(created_at) = self.created_at {
            record.created_at = created_at;
        }
        if self.streak.is_some() {
            record.streak = self.streak;
        }
        if self.last_completed.is_some() {
            record.last_completed = self.last_completed;
        }
        if let Some(completions) = self.completions {
            record.completions = completions;
        }
        if self.order.is_some() {
            record.order = self.order;
        }
    }
}

/// Full list of a user's habit records at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitSnapshot {
    pub records: Vec<(HabitId, HabitRecord)>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitView {
    pub id: HabitId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub order: Option<i64>,
    pub last_completed: Option<NaiveDate>,
    pub is_completed_today: bool,
    pub current_streak: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub completed: bool,
    pub editable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarResponse {
    pub habit_id: HabitId,
    pub days: Vec<DayCell>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub habit_count: usize,
    pub limit: usize,
}
