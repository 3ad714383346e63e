//! Date policy and the completion state machine.
//!
//! All calendar dates are UTC dates. A habit is completed at most once per
//! date and a second completion on the same date changes nothing.

use crate::errors::ValidationError;
use crate::models::Habit;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Recorded,
    AlreadyCompleted,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Length of the run of consecutive dates in `completions` ending at `end`.
pub fn run_ending_at(completions: &BTreeSet<NaiveDate>, end: NaiveDate) -> u32 {
    let mut count = 0u32;
    let mut cursor = end;
    while completions.contains(&cursor) {
        count = count.saturating_add(1);
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    count
}

pub fn record_completion(
    habit: &mut Habit,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<Completion, ValidationError> {
    if date > today {
        return Err(ValidationError::FutureDate(date));
    }
    if habit.last_completed == Some(date) || habit.completions.contains(&date) {
        return Ok(Completion::AlreadyCompleted);
    }

    match habit.last_completed {
        Some(last) if date < last => {
            return Err(ValidationError::BeforeLastCompletion {
                date,
                last_completed: last,
            });
        }
        Some(last) if date.pred_opt() == Some(last) => {
            habit.streak = habit.streak.saturating_add(1);
        }
        _ => habit.streak = 1,
    }

    habit.last_completed = Some(date);
    habit.completions.insert(date);
    Ok(Completion::Recorded)
}

pub fn is_completed_on(habit: &Habit, date: NaiveDate, today: NaiveDate) -> bool {
    date <= today && habit.completions.contains(&date)
}

/// Consecutive completed days counted backward from `today` inclusive.
pub fn current_streak(habit: &Habit, today: NaiveDate) -> u32 {
    if habit.last_completed == Some(today) {
        habit.streak
    } else {
        0
    }
}
