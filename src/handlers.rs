use crate::draft::{self, PersistedDraft};
use crate::errors::AppError;
use crate::models::{
    Category, DebounceParams, FieldUpdate, MoodEntry, NewItemRequest, Rating, StatsResponse,
    TrackingItem,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::storage::{persist_data, with_entry};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn get_draft(State(state): State<AppState>) -> Json<PersistedDraft> {
    let store = state.draft.lock().await;
    Json(draft::encode(store.get()))
}

pub async fn replace_draft(
    State(state): State<AppState>,
    Json(payload): Json<PersistedDraft>,
) -> Result<Json<PersistedDraft>, AppError> {
    let next = draft::decode(payload);
    for category in Category::ALL {
        category.validate_items(next.form_data.items(category))?;
    }
    FieldUpdate::MoodScore(next.form_data.mood_score).validate()?;
    FieldUpdate::SleepHours(next.form_data.sleep_hours).validate()?;

    let mut store = state.draft.lock().await;
    store.set(next);
    Ok(Json(draft::encode(store.get())))
}

pub async fn clear_draft(State(state): State<AppState>) -> Json<PersistedDraft> {
    let mut store = state.draft.lock().await;
    store.clear_draft();
    Json(draft::encode(store.get()))
}

pub async fn reset_draft(State(state): State<AppState>) -> Json<PersistedDraft> {
    let mut store = state.draft.lock().await;
    store.reset_to_defaults();
    Json(draft::encode(store.get()))
}

pub async fn update_field(
    State(state): State<AppState>,
    Query(params): Query<DebounceParams>,
    Json(update): Json<FieldUpdate>,
) -> Result<(StatusCode, Json<PersistedDraft>), AppError> {
    if !params.debounce {
        let key = update.key();
        let mut store = state.draft.lock().await;
        store.update_field(update)?;
        // Queued commits need the draft lock, so cancelling before it is released
        // keeps an older value from landing on top of this one.
        state.debouncer.cancel(key).await;
        return Ok((StatusCode::OK, Json(draft::encode(store.get()))));
    }

    update.validate()?;
    let (generation, snapshot) = {
        let store = state.draft.lock().await;
        (store.generation(), draft::encode(store.get()))
    };
    let key = update.key();
    let draft = Arc::clone(&state.draft);
    state
        .debouncer
        .schedule(key, async move {
            let mut store = draft.lock().await;
            match store.update_field_at(generation, update) {
                Ok(true) => {}
                Ok(false) => info!("discarded debounced {key} update queued before a reset"),
                Err(err) => warn!("debounced {key} update rejected: {err}"),
            }
        })
        .await;

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(category): Path<Category>,
    Json(payload): Json<NewItemRequest>,
) -> Result<Json<PersistedDraft>, AppError> {
    let id = payload
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let item = TrackingItem::new(id, payload.name.trim());

    let mut store = state.draft.lock().await;
    store.add_item(category, item)?;
    state.debouncer.cancel(category.items_key()).await;
    Ok(Json(draft::encode(store.get())))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((category, id)): Path<(Category, String)>,
) -> Result<Json<PersistedDraft>, AppError> {
    let mut store = state.draft.lock().await;
    store.remove_item(category, &id)?;
    state.debouncer.cancel(category.items_key()).await;
    Ok(Json(draft::encode(store.get())))
}

pub async fn toggle_item(
    State(state): State<AppState>,
    Path((category, id)): Path<(Category, String)>,
) -> Result<Json<PersistedDraft>, AppError> {
    let mut store = state.draft.lock().await;
    store.toggle_item(category, &id)?;
    state.debouncer.cancel(category.items_key()).await;
    Ok(Json(draft::encode(store.get())))
}

pub async fn set_rating(
    State(state): State<AppState>,
    Path((category, id)): Path<(Category, String)>,
    Json(rating): Json<Rating>,
) -> Result<Json<PersistedDraft>, AppError> {
    let mut store = state.draft.lock().await;
    store.set_rating(category, &id, rating)?;
    state.debouncer.cancel(category.items_key()).await;
    Ok(Json(draft::encode(store.get())))
}

/// Records the draft as the entry for its date. The draft is only cleared once
/// the history is safely on disk.
pub async fn submit_entry(State(state): State<AppState>) -> Result<Json<MoodEntry>, AppError> {
    let mut store = state.draft.lock().await;
    let today = Local::now().date_naive();
    let entry = MoodEntry {
        date: store.get().draft_date.unwrap_or(today),
        submitted_at: Utc::now(),
        form: store.get().form_data.clone(),
    };

    let mut data = state.data.lock().await;
    let next = with_entry(&data, entry.clone());
    persist_data(&state.data_path, &next).await?;
    *data = next;

    store.clear_draft();
    let date = entry.date;
    store.update(|prev| {
        let mut next = prev.clone();
        next.last_entry_date = Some(date);
        next
    });
    info!("saved entry for {date}");

    Ok(Json(entry))
}

pub async fn list_entries(State(state): State<AppState>) -> Json<Vec<MoodEntry>> {
    let data = state.data.lock().await;
    Json(data.entries.values().rev().cloned().collect())
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<MoodEntry>, AppError> {
    let data = state.data.lock().await;
    data.entries
        .get(&date.to_string())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no entry for {date}")))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_stats(&data)))
}
