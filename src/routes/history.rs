// src/routes/history.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::query_as;

use super::ApiError;
use crate::models::TicketHistoryEntry;
use crate::workflow::{self, NoteTag};
use crate::AppState;

#[derive(Deserialize)]
pub struct AppendNoteBody {
    pub text: String,
    pub tag: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQ {
    /// When true, only customer-visible entries (status changes and public
    /// notes) are returned.
    pub public: Option<bool>,
}

#[derive(Serialize)]
pub struct HistoryView {
    pub entries: Vec<TicketHistoryEntry>,
    pub history_text: String,
}

/// POST /api/v1/tickets/:id/history — free-form operator annotation,
/// append-only.
pub async fn append_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<AppendNoteBody>,
) -> Result<Json<TicketHistoryEntry>, ApiError> {
    let tag = match b.tag.as_deref() {
        None => NoteTag::Note,
        Some(s) => NoteTag::parse(s)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown note tag '{s}'")))?,
    };

    let exists: Option<(i64,)> =
        query_as(r#"SELECT ticket_id FROM public.tickets WHERE ticket_id = $1"#)
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("ticket"));
    }

    let entry = query_as::<_, TicketHistoryEntry>(
        r#"
        INSERT INTO public.ticket_history (ticket_id, kind, content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(tag.as_str())
    .bind(&b.text)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(entry))
}

/// GET /api/v1/tickets/:id/history
pub async fn list_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(q): Query<HistoryQ>,
) -> Result<Json<HistoryView>, ApiError> {
    let exists: Option<(i64,)> =
        query_as(r#"SELECT ticket_id FROM public.tickets WHERE ticket_id = $1"#)
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("ticket"));
    }

    let mut entries = query_as::<_, TicketHistoryEntry>(
        r#"SELECT * FROM public.ticket_history WHERE ticket_id = $1 ORDER BY history_id"#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    if q.public.unwrap_or(false) {
        entries.retain(|e| workflow::is_public_kind(&e.kind));
    }

    let history_text = workflow::render_history(&entries);
    Ok(Json(HistoryView { entries, history_text }))
}
