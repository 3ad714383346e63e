//! Contracts for the external collaborators the habit store depends on.

use crate::errors::BackendError;
use crate::models::{HabitFields, HabitId, HabitSnapshot, UserId};
use std::future::Future;
use tokio::sync::watch;
use tracing::info;

/// Supplies the user identifier that scopes all persisted data.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self) -> impl Future<Output = Result<UserId, BackendError>> + Send;
}

/// Per-user document storage with change notification.
pub trait Persistence: Send + Sync + 'static {
    /// Opens a snapshot stream whose first element is the current state.
    fn subscribe(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Subscription, BackendError>> + Send;

    /// Upserts a partial field set for one habit.
    fn write(
        &self,
        user_id: &UserId,
        habit_id: &HabitId,
        fields: HabitFields,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn remove(
        &self,
        user_id: &UserId,
        habit_id: &HabitId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// A live stream of snapshots for one user.
///
/// Released exactly once, either through [`Subscription::release`] or on drop.
pub struct Subscription {
    user_id: UserId,
    receiver: Option<watch::Receiver<HabitSnapshot>>,
}

impl Subscription {
    pub fn new(user_id: UserId, mut receiver: watch::Receiver<HabitSnapshot>) -> Self {
        receiver.mark_changed();
        info!(user = %user_id, "snapshot subscription acquired");
        Self {
            user_id,
            receiver: Some(receiver),
        }
    }

    /// Waits for the next snapshot. `None` once released or when the
    /// publisher has gone away.
    pub async fn next(&mut self) -> Option<HabitSnapshot> {
        if !self.changed().await {
            return None;
        }
        self.latest()
    }

    /// Waits until a snapshot newer than the last one taken is available.
    pub async fn changed(&mut self) -> bool {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.changed().await.is_ok(),
            None => false,
        }
    }

    /// Takes the most recent snapshot and marks it as seen.
    pub fn latest(&mut self) -> Option<HabitSnapshot> {
        let receiver = self.receiver.as_mut()?;
        let snapshot = receiver.borrow_and_update().clone();
        Some(snapshot)
    }

    pub fn release(&mut self) {
        if self.receiver.take().is_some() {
            info!(user = %self.user_id, "snapshot subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_next_yields_the_current_snapshot() {
        let (tx, rx) = watch::channel(HabitSnapshot::default());
        let mut subscription = Subscription::new(UserId::new("u1"), rx);
        assert_eq!(subscription.next().await, Some(HabitSnapshot::default()));
        drop(tx);
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn release_is_idempotent_and_ends_the_stream() {
        let (tx, rx) = watch::channel(HabitSnapshot::default());
        let mut subscription = Subscription::new(UserId::new("u1"), rx);
        assert_eq!(tx.receiver_count(), 1);

        subscription.release();
        subscription.release();
        assert_eq!(tx.receiver_count(), 0);
        assert_eq!(subscription.next().await, None);
    }
}
