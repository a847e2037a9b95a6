// src/routes/tickets.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as};

use super::ApiError;
use crate::models::{Deleted, Ticket, TicketHistoryEntry};
use crate::workflow::{self, TicketStatus};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateTicketBody {
    pub client_id: i64,
    pub device: Option<String>,
    pub issue: Option<String>,
    pub estimated_quote: Option<f64>,
}

#[derive(Deserialize)]
pub struct ListQ {
    pub status: Option<String>,
    pub client_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct PatchTicketBody {
    pub device: Option<String>,
    pub issue: Option<String>,
    pub estimated_quote: Option<f64>,
    pub final_tariff: Option<f64>,
    pub supplement_price: Option<f64>,
    pub deposit_paid: Option<f64>,
    pub discount_amount: Option<f64>,
    pub discount_percent: Option<f64>,
}

#[derive(Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub history: Vec<TicketHistoryEntry>,
    pub history_text: String,
}

/// POST /api/v1/tickets
///
/// Creates the ticket in `awaiting_diagnosis` and assigns the fixed-width
/// code derived from the row id, all in one transaction.
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(b): Json<CreateTicketBody>,
) -> Result<Json<Ticket>, ApiError> {
    let mut tx = state.pool.begin().await?;

    let client_exists: Option<(i64,)> =
        query_as(r#"SELECT client_id FROM public.clients WHERE client_id = $1"#)
            .bind(b.client_id)
            .fetch_optional(&mut *tx)
            .await?;
    if client_exists.is_none() {
        return Err(ApiError::NotFound("client"));
    }

    let inserted: Ticket = query_as(
        r#"
        INSERT INTO public.tickets (client_id, device, issue, estimated_quote, status)
        VALUES ($1, $2, $3, $4, 'awaiting_diagnosis')
        RETURNING *
        "#,
    )
    .bind(b.client_id)
    .bind(&b.device)
    .bind(&b.issue)
    .bind(b.estimated_quote)
    .fetch_one(&mut *tx)
    .await?;

    let code = format!("T-{:06}", inserted.ticket_id);
    let ticket: Ticket = query_as(
        r#"UPDATE public.tickets SET code = $2 WHERE ticket_id = $1 RETURNING *"#,
    )
    .bind(inserted.ticket_id)
    .bind(&code)
    .fetch_one(&mut *tx)
    .await?;

    query(
        r#"INSERT INTO public.ticket_history (ticket_id, kind, content) VALUES ($1, 'status', $2)"#,
    )
    .bind(ticket.ticket_id)
    .bind(format!("Ticket {code} created"))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Json(ticket))
}

/// GET /api/v1/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    if let Some(ref s) = q.status {
        if TicketStatus::parse(s).is_none() {
            return Err(ApiError::InvalidStatus(s.clone()));
        }
    }
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);

    let rows = query_as::<_, Ticket>(
        r#"
        SELECT * FROM public.tickets
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::bigint IS NULL OR client_id = $2)
        ORDER BY ticket_id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(q.status)
    .bind(q.client_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/tickets/:id — row plus audit trail, with the legacy text log
/// rendered from the structured entries.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TicketDetail>, ApiError> {
    let ticket = query_as::<_, Ticket>(r#"SELECT * FROM public.tickets WHERE ticket_id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("ticket"))?;

    let history = query_as::<_, TicketHistoryEntry>(
        r#"SELECT * FROM public.ticket_history WHERE ticket_id = $1 ORDER BY history_id"#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let history_text = workflow::render_history(&history);
    Ok(Json(TicketDetail { ticket, history, history_text }))
}

/// PATCH /api/v1/tickets/:id — monetary and descriptive fields only; status,
/// paid and the timer fields have their own operations.
pub async fn patch_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchTicketBody>,
) -> Result<Json<Ticket>, ApiError> {
    if b.discount_amount.is_some() && b.discount_percent.is_some() {
        return Err(ApiError::BadRequest(
            "discount_amount and discount_percent are mutually exclusive".into(),
        ));
    }

    // Setting one discount form clears the other.
    let row = query_as::<_, Ticket>(
        r#"
        UPDATE public.tickets SET
            device = COALESCE($2, device),
            issue = COALESCE($3, issue),
            estimated_quote = COALESCE($4, estimated_quote),
            final_tariff = COALESCE($5, final_tariff),
            supplement_price = COALESCE($6, supplement_price),
            deposit_paid = COALESCE($7, deposit_paid),
            discount_amount = CASE
                WHEN $8::float8 IS NOT NULL THEN $8
                WHEN $9::float8 IS NOT NULL THEN NULL
                ELSE discount_amount END,
            discount_percent = CASE
                WHEN $9::float8 IS NOT NULL THEN $9
                WHEN $8::float8 IS NOT NULL THEN NULL
                ELSE discount_percent END,
            updated_at = now()
        WHERE ticket_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.device)
    .bind(b.issue)
    .bind(b.estimated_quote)
    .bind(b.final_tariff)
    .bind(b.supplement_price)
    .bind(b.deposit_paid)
    .bind(b.discount_amount)
    .bind(b.discount_percent)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound("ticket"))?;
    Ok(Json(row))
}

/// DELETE /api/v1/tickets/:id — administrative cascade; history and ledger
/// rows go with the ticket via the schema FKs.
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Deleted>, ApiError> {
    let res = query(r#"DELETE FROM public.tickets WHERE ticket_id = $1"#)
        .bind(id)
        .execute(&state.pool)
        .await?;
    Ok(Json(Deleted { deleted: res.rows_affected() > 0 }))
}
