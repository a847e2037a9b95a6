// src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ───────────────────────────────────────
// Tickets & audit trail
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub ticket_id: i64,
    pub client_id: i64,
    pub code: Option<String>,          // assigned in the creation transaction
    pub device: Option<String>,
    pub issue: Option<String>,
    pub status: String,                // one of the 8 workflow statuses
    pub paid: bool,
    pub estimated_quote: Option<f64>,
    pub final_tariff: Option<f64>,
    pub supplement_price: Option<f64>,
    pub deposit_paid: Option<f64>,
    pub discount_amount: Option<f64>,
    pub discount_percent: Option<f64>,
    pub repair_start: Option<DateTime<Utc>>,
    pub repair_end: Option<DateTime<Utc>>,
    pub repair_seconds_accumulated: i64,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketHistoryEntry {
    pub history_id: i64,
    pub ticket_id: i64,
    pub kind: String,                  // status | note | internal | alert
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Loyalty (client rows are owned elsewhere; only the balance fields
// are mutated here, and only through loyalty accounting)
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub points_balance: i64,
    pub total_spent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LoyaltyLedgerEntry {
    pub entry_id: i64,
    pub client_id: i64,
    pub ticket_id: Option<i64>,
    pub kind: String,                  // "gain" | "redemption:<reward>"
    pub points: i64,                   // positive for gain, negative for redemption
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// DTOs helpful for endpoints
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusChanged {
    pub ticket_id: i64,
    pub old_status: String,
    pub new_status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreditResult {
    pub points_gained: i64,
    pub new_total_points: i64,
    pub rewards_unlocked: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}
