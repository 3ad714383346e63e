//! In-memory habit list for one signed-in user.
//!
//! Mutations are applied optimistically and then written through the
//! persistence collaborator. Inbound snapshots replace the whole list. A
//! failed write is reported but not rolled back; the next snapshot
//! reconciles.

use crate::backend::Persistence;
use crate::errors::{BackendError, HabitError, ValidationError};
use crate::models::{Habit, HabitId, HabitSnapshot, UserId};
use crate::streak::{self, Completion};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const FREE_TIER_LIMIT: usize = 3;

pub struct HabitStore<P> {
    user_id: UserId,
    backend: Arc<P>,
    habits: Vec<Habit>,
}

impl<P: Persistence> HabitStore<P> {
    pub fn new(user_id: UserId, backend: Arc<P>) -> Self {
        Self {
            user_id,
            backend,
            habits: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Habits in display order: manual `order` first, then creation time.
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn len(&self) -> usize {
        self.habits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty()
    }

    pub fn get(&self, id: &HabitId) -> Result<&Habit, HabitError> {
        self.habits
            .iter()
            .find(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::NotFound(id.clone()))
    }

    fn get_mut(&mut self, id: &HabitId) -> Result<&mut Habit, HabitError> {
        self.habits
            .iter_mut()
            .find(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::NotFound(id.clone()))
    }

    pub fn apply_snapshot(&mut self, snapshot: HabitSnapshot) {
        let total = snapshot.records.len();
        let mut habits: Vec<Habit> = snapshot
            .records
            .into_iter()
            .filter_map(|(id, record)| {
                let habit = Habit::from_record(id.clone(), record);
                if habit.is_none() {
                    warn!(user = %self.user_id, habit = %id, "skipping malformed habit record");
                }
                habit
            })
            .collect();
        habits.sort_by(|a, b| {
            (a.order.unwrap_or(i64::MAX), a.created_at, &a.id)
                .cmp(&(b.order.unwrap_or(i64::MAX), b.created_at, &b.id))
        });
        info!(user = %self.user_id, habits = habits.len(), records = total, "applied snapshot");
        self.habits = habits;
    }

    pub async fn create(&mut self, name: &str) -> Result<Habit, HabitError> {
        self.create_at(name, Utc::now()).await
    }

    pub async fn create_at(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.habits.len() >= FREE_TIER_LIMIT {
            return Err(HabitError::LimitReached {
                limit: FREE_TIER_LIMIT,
            });
        }

        let habit = Habit::new(name.to_string(), now);
        self.habits.push(habit.clone());
        self.backend
            .write(&self.user_id, &habit.id, habit.to_fields())
            .await
            .inspect_err(|err| warn!(habit = %habit.id, "failed to write new habit: {err}"))?;

        info!(user = %self.user_id, habit = %habit.id, "created habit");
        Ok(habit)
    }

    /// Deletes a habit. An unknown id is reported as `NotFound`.
    pub async fn delete(&mut self, id: &HabitId) -> Result<(), HabitError> {
        let position = self
            .habits
            .iter()
            .position(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::NotFound(id.clone()))?;
        self.habits.remove(position);
        self.backend
            .remove(&self.user_id, id)
            .await
            .inspect_err(|err| warn!(habit = %id, "failed to remove habit: {err}"))?;

        info!(user = %self.user_id, habit = %id, "deleted habit");
        Ok(())
    }

    /// Completes a habit on `date`, today when absent.
    pub async fn toggle_completion(
        &mut self,
        id: &HabitId,
        date: Option<NaiveDate>,
    ) -> Result<Habit, HabitError> {
        let today = streak::today();
        self.toggle_completion_at(id, date.unwrap_or(today), today)
            .await
    }

    pub async fn toggle_completion_at(
        &mut self,
        id: &HabitId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Habit, HabitError> {
        let habit = self.get_mut(id)?;
        if streak::record_completion(habit, date, today)? == Completion::AlreadyCompleted {
            return Ok(habit.clone());
        }

        let updated = habit.clone();
        match self
            .backend
            .write(&self.user_id, id, updated.completion_fields())
            .await
        {
            Ok(()) => Ok(updated),
            // removed by another session before its snapshot reached us
            Err(BackendError::MissingRecord(_)) => Err(HabitError::NotFound(id.clone())),
            Err(err) => {
                warn!(habit = %id, "failed to write completion: {err}");
                Err(err.into())
            }
        }
    }

    pub fn completion_status_for(&self, id: &HabitId, date: NaiveDate) -> Result<bool, HabitError> {
        self.completion_status_at(id, date, streak::today())
    }

    pub fn completion_status_at(
        &self,
        id: &HabitId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool, HabitError> {
        Ok(streak::is_completed_on(self.get(id)?, date, today))
    }

    pub fn current_streak(&self, id: &HabitId) -> Result<u32, HabitError> {
        self.current_streak_at(id, streak::today())
    }

    pub fn current_streak_at(&self, id: &HabitId, today: NaiveDate) -> Result<u32, HabitError> {
        Ok(streak::current_streak(self.get(id)?, today))
    }
}
