use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/draft",
            get(handlers::get_draft)
                .put(handlers::replace_draft)
                .delete(handlers::clear_draft),
        )
        .route("/api/draft/reset", post(handlers::reset_draft))
        .route("/api/draft/field", post(handlers::update_field))
        .route("/api/draft/items/:category", post(handlers::add_item))
        .route(
            "/api/draft/items/:category/:id",
            delete(handlers::remove_item),
        )
        .route(
            "/api/draft/items/:category/:id/toggle",
            post(handlers::toggle_item),
        )
        .route(
            "/api/draft/items/:category/:id/rating",
            put(handlers::set_rating),
        )
        .route(
            "/api/entries",
            get(handlers::list_entries).post(handlers::submit_entry),
        )
        .route("/api/entries/:date", get(handlers::get_entry))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
}
