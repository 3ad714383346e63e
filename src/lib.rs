pub mod app;
pub mod auth;
pub mod backend;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod streak;

pub use app::router;
pub use config::AppConfig;
pub use session::Session;
pub use state::AppState;
pub use storage::DocumentStore;
pub use store::{HabitStore, FREE_TIER_LIMIT};
