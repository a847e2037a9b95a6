// src/routes/loyalty.rs
//
// Loyalty accounting. Crediting is idempotent per ticket through the partial
// unique index on the ledger; redemption decrements through a conditional
// UPDATE so the balance can never go negative.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, Postgres, Transaction};

use super::ApiError;
use crate::config::LoyaltyConfig;
use crate::loyalty::{self, NextReward, Reward};
use crate::models::{Client, CreditResult, LoyaltyLedgerEntry, Ticket};
use crate::AppState;

const LEDGER_PAGE: i64 = 20;

#[derive(Deserialize)]
pub struct RedeemBody {
    pub reward: String,
}

#[derive(Serialize)]
pub struct Redeemed {
    pub reward: String,
    pub points_spent: i64,
    pub new_total_points: i64,
    pub description: String,
}

#[derive(Serialize)]
pub struct LoyaltyState {
    pub client_id: i64,
    pub points_balance: i64,
    pub total_spent: f64,
    pub next_reward: NextReward,
    pub ledger: Vec<LoyaltyLedgerEntry>,
}

/// Credits the ticket's payment inside the caller's transaction. Disabled
/// program, non-positive amount and an already-credited ticket all come back
/// as a zero-gain result, never an error, so payment toggles stay retryable.
pub(crate) async fn credit_on_payment(
    tx: &mut Transaction<'_, Postgres>,
    cfg: &LoyaltyConfig,
    ticket: &Ticket,
) -> Result<CreditResult, ApiError> {
    let (balance,): (i64,) =
        query_as(r#"SELECT points_balance FROM public.clients WHERE client_id = $1 FOR UPDATE"#)
            .bind(ticket.client_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(ApiError::NotFound("client"))?;

    let no_effect = |balance| CreditResult {
        points_gained: 0,
        new_total_points: balance,
        rewards_unlocked: vec![],
    };

    if !cfg.enabled {
        return Ok(no_effect(balance));
    }

    let amount = loyalty::payable_amount(ticket);
    let points = loyalty::points_for_amount(amount, cfg);
    if amount <= 0.0 || points <= 0 {
        return Ok(no_effect(balance));
    }

    // The partial unique index resolves concurrent credits; zero rows
    // affected means some earlier call already credited this ticket.
    let inserted = query(
        r#"
        INSERT INTO public.loyalty_ledger (client_id, ticket_id, kind, points, description)
        VALUES ($1, $2, 'gain', $3, $4)
        ON CONFLICT (ticket_id) WHERE kind = 'gain' DO NOTHING
        "#,
    )
    .bind(ticket.client_id)
    .bind(ticket.ticket_id)
    .bind(points)
    .bind(format!(
        "Payment of ticket {}",
        ticket.code.as_deref().unwrap_or("?")
    ))
    .execute(&mut **tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Ok(no_effect(balance));
    }

    let (new_balance,): (i64,) = query_as(
        r#"
        UPDATE public.clients
           SET points_balance = points_balance + $2,
               total_spent = total_spent + $3,
               updated_at = now()
         WHERE client_id = $1
        RETURNING points_balance
        "#,
    )
    .bind(ticket.client_id)
    .bind(points)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;

    Ok(CreditResult {
        points_gained: points,
        new_total_points: new_balance,
        rewards_unlocked: loyalty::rewards_unlocked(balance, new_balance, cfg),
    })
}

/// POST /api/v1/clients/:id/redeem
pub async fn redeem(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Json(b): Json<RedeemBody>,
) -> Result<Json<Redeemed>, ApiError> {
    let reward = Reward::parse(&b.reward)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown reward '{}'", b.reward)))?;
    let cost = reward.threshold(&state.loyalty);

    let mut tx = state.pool.begin().await?;

    let (balance,): (i64,) =
        query_as(r#"SELECT points_balance FROM public.clients WHERE client_id = $1 FOR UPDATE"#)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound("client"))?;

    // Decrement-if-sufficient; no row back means the balance guard failed.
    let updated: Option<(i64,)> = query_as(
        r#"
        UPDATE public.clients
           SET points_balance = points_balance - $2, updated_at = now()
         WHERE client_id = $1 AND points_balance >= $2
        RETURNING points_balance
        "#,
    )
    .bind(client_id)
    .bind(cost)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((new_balance,)) = updated else {
        return Err(ApiError::InsufficientPoints { have: balance, need: cost });
    };

    let description = reward.description(&state.loyalty);
    query(
        r#"
        INSERT INTO public.loyalty_ledger (client_id, ticket_id, kind, points, description)
        VALUES ($1, NULL, $2, $3, $4)
        "#,
    )
    .bind(client_id)
    .bind(reward.ledger_kind())
    .bind(-cost)
    .bind(&description)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(Redeemed {
        reward: reward.as_str().to_string(),
        points_spent: cost,
        new_total_points: new_balance,
        description,
    }))
}

/// GET /api/v1/clients/:id/loyalty — read-only snapshot.
pub async fn get_loyalty_state(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<Json<LoyaltyState>, ApiError> {
    let client = query_as::<_, Client>(r#"SELECT * FROM public.clients WHERE client_id = $1"#)
        .bind(client_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("client"))?;

    let ledger = query_as::<_, LoyaltyLedgerEntry>(
        r#"
        SELECT * FROM public.loyalty_ledger
        WHERE client_id = $1
        ORDER BY entry_id DESC
        LIMIT $2
        "#,
    )
    .bind(client_id)
    .bind(LEDGER_PAGE)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(LoyaltyState {
        client_id,
        points_balance: client.points_balance,
        total_spent: client.total_spent,
        next_reward: loyalty::next_reward(client.points_balance, &state.loyalty),
        ledger,
    }))
}
