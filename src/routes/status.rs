// src/routes/status.rs
//
// The two workflow mutations: status change and payment toggle. Each is one
// transaction; the notification collaborator is only told after commit.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{query, query_as};

use super::{loyalty, ApiError};
use crate::models::{CreditResult, StatusChanged, Ticket};
use crate::workflow::{self, TicketStatus};
use crate::AppState;

#[derive(Deserialize)]
pub struct ChangeStatusBody {
    pub status: String,
}

#[derive(Deserialize)]
pub struct SetPaidBody {
    pub paid: bool,
}

#[derive(Serialize)]
pub struct PaidChanged {
    pub ticket_id: i64,
    pub paid: bool,
    pub credit: Option<CreditResult>,
}

/// POST /api/v1/tickets/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<ChangeStatusBody>,
) -> Result<Json<StatusChanged>, ApiError> {
    let new_status =
        TicketStatus::parse(&b.status).ok_or_else(|| ApiError::InvalidStatus(b.status.clone()))?;

    let mut tx = state.pool.begin().await?;

    let mut ticket =
        query_as::<_, Ticket>(r#"SELECT * FROM public.tickets WHERE ticket_id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("ticket"))?;

    let stored_status = ticket.status.clone();
    let now = Utc::now();
    let change = workflow::apply_status_change(&mut ticket, new_status, now)
        .ok_or_else(|| ApiError::Internal(format!("ticket {id} has unknown status '{stored_status}'")))?;

    if !workflow::transition_allowed(change.old_status, change.new_status) {
        return Err(ApiError::BadRequest(format!(
            "transition {} → {} not allowed",
            change.old_status.as_str(),
            change.new_status.as_str()
        )));
    }

    query(
        r#"
        UPDATE public.tickets SET
            status = $2,
            repair_start = $3,
            repair_end = $4,
            repair_seconds_accumulated = $5,
            closed_at = $6,
            updated_at = $7
        WHERE ticket_id = $1
        "#,
    )
    .bind(id)
    .bind(&ticket.status)
    .bind(ticket.repair_start)
    .bind(ticket.repair_end)
    .bind(ticket.repair_seconds_accumulated)
    .bind(ticket.closed_at)
    .bind(ticket.updated_at)
    .execute(&mut *tx)
    .await?;

    query(
        r#"INSERT INTO public.ticket_history (ticket_id, kind, content, created_at)
           VALUES ($1, 'status', $2, $3)"#,
    )
    .bind(id)
    .bind(&change.audit_line)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let event = if change.entered_repair_complete {
        "repair_complete"
    } else {
        "status_changed"
    };
    state.notifier.notify(
        event,
        ticket.code.clone().unwrap_or_default(),
        json!({
            "old_status": change.old_status.as_str(),
            "new_status": change.new_status.as_str(),
        }),
    );

    Ok(Json(StatusChanged {
        ticket_id: id,
        old_status: change.old_status.as_str().to_string(),
        new_status: change.new_status.as_str().to_string(),
    }))
}

/// PATCH /api/v1/tickets/:id/paid
///
/// Setting paid=true also runs the loyalty credit in the same transaction;
/// re-toggling is safe because the gain entry is unique per ticket.
pub async fn set_paid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<SetPaidBody>,
) -> Result<Json<PaidChanged>, ApiError> {
    let mut tx = state.pool.begin().await?;

    let ticket =
        query_as::<_, Ticket>(r#"SELECT * FROM public.tickets WHERE ticket_id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("ticket"))?;

    query(r#"UPDATE public.tickets SET paid = $2, updated_at = now() WHERE ticket_id = $1"#)
        .bind(id)
        .bind(b.paid)
        .execute(&mut *tx)
        .await?;

    let credit = if b.paid {
        Some(loyalty::credit_on_payment(&mut tx, &state.loyalty, &ticket).await?)
    } else {
        None
    };

    tx.commit().await?;

    if b.paid {
        state.notifier.notify(
            "payment_recorded",
            ticket.code.clone().unwrap_or_default(),
            json!({ "points_gained": credit.as_ref().map(|c| c.points_gained) }),
        );
    }

    Ok(Json(PaidChanged { ticket_id: id, paid: b.paid, credit }))
}
