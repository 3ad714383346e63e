use crate::calendar::{build_calendar_at, habit_view, DEFAULT_CALENDAR_DAYS};
use crate::errors::AppError;
use crate::models::{
    CalendarQuery, CalendarResponse, CreateHabitRequest, HabitId, HabitView, SessionResponse,
    ToggleRequest,
};
use crate::state::AppState;
use crate::store::FREE_TIER_LIMIT;
use crate::streak::today;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let store = state.store.lock().await;
    Json(SessionResponse {
        user_id: state.user_id.clone(),
        habit_count: store.len(),
        limit: FREE_TIER_LIMIT,
    })
}

pub async fn list_habits(State(state): State<AppState>) -> Json<Vec<HabitView>> {
    let today = today();
    let store = state.store.lock().await;
    Json(
        store
            .habits()
            .iter()
            .map(|habit| habit_view(habit, today))
            .collect(),
    )
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<HabitView>), AppError> {
    let mut store = state.store.lock().await;
    let habit = store.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(habit_view(&habit, today()))))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut store = state.store.lock().await;
    store.delete(&HabitId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<HabitView>, AppError> {
    let today = today();
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ToggleRequest::default()
    } else {
        serde_json::from_slice::<ToggleRequest>(&body)
            .map_err(|err| AppError::bad_request(format!("invalid toggle request: {err}")))?
    };
    let date = request.date.unwrap_or(today);

    let mut store = state.store.lock().await;
    let habit = store
        .toggle_completion_at(&HabitId::from(id), date, today)
        .await?;
    Ok(Json(habit_view(&habit, today)))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_CALENDAR_DAYS);
    if days == 0 {
        return Err(AppError::bad_request("days must be at least 1"));
    }

    let store = state.store.lock().await;
    let habit = store.get(&HabitId::from(id))?;
    Ok(Json(build_calendar_at(habit, today(), days)))
}
