use crate::models::UserId;
use crate::storage::DocumentStore;
use crate::store::HabitStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub user_id: UserId,
    pub store: Arc<Mutex<HabitStore<DocumentStore>>>,
}

impl AppState {
    pub fn new(user_id: UserId, store: Arc<Mutex<HabitStore<DocumentStore>>>) -> Self {
        Self { user_id, store }
    }
}
