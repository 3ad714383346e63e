use crate::backend::{Persistence, Subscription};
use crate::errors::BackendError;
use crate::models::{HabitFields, HabitId, HabitRecord, HabitSnapshot, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{watch, Mutex};
use tracing::{error, warn};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Documents {
    pub users: BTreeMap<UserId, BTreeMap<HabitId, HabitRecord>>,
}

impl Documents {
    fn snapshot(&self, user_id: &UserId) -> HabitSnapshot {
        let records = self
            .users
            .get(user_id)
            .map(|habits| {
                habits
                    .iter()
                    .map(|(id, record)| (id.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default();
        HabitSnapshot { records }
    }
}

struct Inner {
    documents: Documents,
    channels: HashMap<UserId, watch::Sender<HabitSnapshot>>,
}

/// Local document backend: one JSON file holding every user's habit
/// records, or memory only when no path is given.
pub struct DocumentStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self::with_documents(None, Documents::default())
    }

    pub async fn open(path: &Path) -> Self {
        let documents = load_documents(path).await;
        Self::with_documents(Some(path.to_path_buf()), documents)
    }

    fn with_documents(path: Option<PathBuf>, documents: Documents) -> Self {
        Self {
            path,
            inner: Mutex::new(Inner {
                documents,
                channels: HashMap::new(),
            }),
        }
    }

    pub async fn active_subscriptions(&self, user_id: &UserId) -> usize {
        let inner = self.inner.lock().await;
        inner
            .channels
            .get(user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Persists `staged` and only then makes it the live state.
    async fn commit(
        &self,
        inner: &mut Inner,
        user_id: &UserId,
        staged: Documents,
    ) -> Result<(), BackendError> {
        if let Some(path) = &self.path {
            persist_documents(path, &staged).await?;
        }
        inner.documents = staged;
        if let Some(sender) = inner.channels.get(user_id) {
            sender.send_replace(inner.documents.snapshot(user_id));
        }
        Ok(())
    }
}

impl Persistence for DocumentStore {
    async fn subscribe(&self, user_id: &UserId) -> Result<Subscription, BackendError> {
        let mut inner = self.inner.lock().await;
        let snapshot = inner.documents.snapshot(user_id);
        let receiver = inner
            .channels
            .entry(user_id.clone())
            .or_insert_with(|| watch::Sender::new(snapshot))
            .subscribe();
        Ok(Subscription::new(user_id.clone(), receiver))
    }

    async fn write(
        &self,
        user_id: &UserId,
        habit_id: &HabitId,
        fields: HabitFields,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        let mut staged = inner.documents.clone();
        let habits = staged.users.entry(user_id.clone()).or_default();
        match habits.get_mut(habit_id) {
            Some(record) => fields.merge_into(record),
            None => {
                let record = fields
                    .into_record()
                    .ok_or_else(|| BackendError::MissingRecord(habit_id.clone()))?;
                habits.insert(habit_id.clone(), record);
            }
        }
        self.commit(&mut inner, user_id, staged).await
    }

    async fn remove(&self, user_id: &UserId, habit_id: &HabitId) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        let mut staged = inner.documents.clone();
        let removed = staged
            .users
            .get_mut(user_id)
            .and_then(|habits| habits.remove(habit_id));
        if removed.is_none() {
            warn!(user = %user_id, habit = %habit_id, "remove of unknown record");
        }
        self.commit(&mut inner, user_id, staged).await
    }
}

pub async fn load_documents(path: &Path) -> Documents {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(documents) => documents,
            Err(err) => {
                error!("failed to parse data file: {err}");
                Documents::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Documents::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Documents::default()
        }
    }
}

pub async fn persist_documents(path: &Path, documents: &Documents) -> Result<(), BackendError> {
    let payload = serde_json::to_vec_pretty(documents)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unique_data_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("habit_store_{}_{}.json", std::process::id(), nanos));
        path
    }

    fn new_fields(name: &str) -> HabitFields {
        HabitFields {
            name: Some(name.to_string()),
            created_at: Some(Utc::now()),
            streak: Some(0),
            ..HabitFields::default()
        }
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let path = unique_data_path();
        let user = UserId::new("u1");
        let id = HabitId::from("h1");

        let store = DocumentStore::open(&path).await;
        store.write(&user, &id, new_fields("Read")).await.unwrap();
        store
            .write(
                &user,
                &id,
                HabitFields {
                    streak: Some(2),
                    ..HabitFields::default()
                },
            )
            .await
            .unwrap();

        let reopened = load_documents(&path).await;
        let record = &reopened.users[&user][&id];
        assert_eq!(record.name, "Read");
        assert_eq!(record.streak, Some(2));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn partial_write_of_unknown_record_fails() {
        let store = DocumentStore::in_memory();
        let err = store
            .write(
                &UserId::new("u1"),
                &HabitId::from("missing"),
                HabitFields {
                    streak: Some(1),
                    ..HabitFields::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingRecord(_)));
    }

    #[tokio::test]
    async fn subscribers_see_every_change_scoped_to_their_user() {
        let store = DocumentStore::in_memory();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let mut subscription = store.subscribe(&alice).await.unwrap();

        let initial = subscription.next().await.unwrap();
        assert!(initial.records.is_empty());

        store.write(&bob, &HabitId::from("b1"), new_fields("Run")).await.unwrap();
        store.write(&alice, &HabitId::from("a1"), new_fields("Read")).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].1.name, "Read");

        store.remove(&alice, &HabitId::from("a1")).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert!(snapshot.records.is_empty());
    }

    #[tokio::test]
    async fn failed_persist_leaves_documents_unchanged() {
        let mut path = unique_data_path();
        path.set_extension("");
        let path = path.join("missing_dir").join("habits.json");
        let store = DocumentStore::open(&path).await;
        let user = UserId::new("u1");

        let err = store
            .write(&user, &HabitId::from("h1"), new_fields("Read"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Io(_)));

        let mut subscription = store.subscribe(&user).await.unwrap();
        let snapshot = subscription.next().await.unwrap();
        assert!(snapshot.records.is_empty());
    }

    #[tokio::test]
    async fn dropping_a_subscription_releases_it() {
        let store = DocumentStore::in_memory();
        let user = UserId::new("u1");
        let subscription = store.subscribe(&user).await.unwrap();
        assert_eq!(store.active_subscriptions(&user).await, 1);
        drop(subscription);
        assert_eq!(store.active_subscriptions(&user).await, 0);
    }
}
