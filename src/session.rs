use crate::backend::{AuthProvider, Persistence};
use crate::errors::HabitError;
use crate::models::UserId;
use crate::store::HabitStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A signed-in user with a live habit store.
///
/// `start` signs in, subscribes to the user's habits and keeps the store fed
/// with snapshots until `end` releases the subscription.
pub struct Session<P> {
    user_id: UserId,
    store: Arc<Mutex<HabitStore<P>>>,
    sync_task: JoinHandle<()>,
}

impl<P: Persistence> Session<P> {
    pub async fn start<A: AuthProvider>(auth: &A, backend: Arc<P>) -> Result<Self, HabitError> {
        let user_id = auth.sign_in().await.inspect_err(|err| error!("sign-in failed: {err}"))?;
        let mut subscription = backend.subscribe(&user_id).await?;

        let mut store = HabitStore::new(user_id.clone(), backend);
        if let Some(snapshot) = subscription.next().await {
            store.apply_snapshot(snapshot);
        }
        let store = Arc::new(Mutex::new(store));

        let sync_store = Arc::clone(&store);
        let sync_task = tokio::spawn(async move {
            // Writes publish while holding the store lock, so the newest
            // snapshot must be read only once the lock is ours.
            while subscription.changed().await {
                let mut store = sync_store.lock().await;
                if let Some(snapshot) = subscription.latest() {
                    store.apply_snapshot(snapshot);
                }
            }
            subscription.release();
        });

        info!(user = %user_id, "session started");
        Ok(Self {
            user_id,
            store,
            sync_task,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn store(&self) -> &Arc<Mutex<HabitStore<P>>> {
        &self.store
    }

    /// Stops snapshot delivery and releases the subscription.
    pub async fn end(self) {
        self.sync_task.abort();
        let _ = self.sync_task.await;
        info!(user = %self.user_id, "session ended");
    }
}
