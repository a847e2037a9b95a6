// src/loyalty.rs
//
// Pure loyalty arithmetic: payable amounts, point computation, reward
// thresholds. The transactional halves (gain idempotency via the partial
// unique index, decrement-if-sufficient) live in the route handlers.

use serde::Serialize;

use crate::config::LoyaltyConfig;
use crate::models::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    Film,
    Discount,
}

pub const ALL_REWARDS: [Reward; 2] = [Reward::Film, Reward::Discount];

impl Reward {
    pub fn as_str(self) -> &'static str {
        match self {
            Reward::Film => "film",
            Reward::Discount => "discount",
        }
    }

    pub fn parse(s: &str) -> Option<Reward> {
        match s {
            "film" => Some(Reward::Film),
            "discount" => Some(Reward::Discount),
            _ => None,
        }
    }

    /// Ledger kind for a redemption of this reward.
    pub fn ledger_kind(self) -> String {
        format!("redemption:{}", self.as_str())
    }

    pub fn threshold(self, cfg: &LoyaltyConfig) -> i64 {
        match self {
            Reward::Film => cfg.film_threshold,
            Reward::Discount => cfg.discount_threshold,
        }
    }

    pub fn description(self, cfg: &LoyaltyConfig) -> String {
        match self {
            Reward::Film => "Protective film reward".to_string(),
            Reward::Discount => format!("{}€ voucher", cfg.discount_value_eur),
        }
    }
}

/// Amount the payment covers: final tariff when set, the estimate otherwise,
/// plus any supplement.
pub fn payable_amount(ticket: &Ticket) -> f64 {
    ticket.final_tariff.or(ticket.estimated_quote).unwrap_or(0.0)
        + ticket.supplement_price.unwrap_or(0.0)
}

pub fn points_for_amount(amount: f64, cfg: &LoyaltyConfig) -> i64 {
    (amount * cfg.points_per_euro as f64).floor() as i64
}

/// Rewards whose threshold the balance crossed with this credit.
pub fn rewards_unlocked(old_balance: i64, new_balance: i64, cfg: &LoyaltyConfig) -> Vec<String> {
    ALL_REWARDS
        .iter()
        .filter(|r| old_balance < r.threshold(cfg) && new_balance >= r.threshold(cfg))
        .map(|r| r.as_str().to_string())
        .collect()
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NextReward {
    pub reward: String,
    pub threshold: i64,
    pub points_missing: i64,
}

/// Which reward is nearest and how many points remain; `points_missing == 0`
/// means it is already redeemable. Derived from the balance alone.
pub fn next_reward(balance: i64, cfg: &LoyaltyConfig) -> NextReward {
    let (reward, threshold) = ALL_REWARDS
        .iter()
        .map(|r| (*r, r.threshold(cfg)))
        .min_by_key(|(_, th)| (th - balance).max(0))
        .unwrap_or((Reward::Film, cfg.film_threshold));
    NextReward {
        reward: reward.as_str().to_string(),
        threshold,
        points_missing: (threshold - balance).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cfg() -> LoyaltyConfig {
        LoyaltyConfig::default()
    }

    fn ticket() -> Ticket {
        Ticket {
            ticket_id: 7,
            client_id: 3,
            code: Some("T-000007".into()),
            device: None,
            issue: None,
            status: "repair_complete".into(),
            paid: false,
            estimated_quote: None,
            final_tariff: None,
            supplement_price: None,
            deposit_paid: None,
            discount_amount: None,
            discount_percent: None,
            repair_start: None,
            repair_end: None,
            repair_seconds_accumulated: 0,
            closed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payable_amount_prefers_final_tariff() {
        let mut t = ticket();
        t.estimated_quote = Some(80.0);
        t.final_tariff = Some(100.0);
        t.supplement_price = Some(15.0);
        assert_eq!(payable_amount(&t), 115.0);
    }

    #[test]
    fn payable_amount_falls_back_to_estimate() {
        let mut t = ticket();
        t.estimated_quote = Some(80.0);
        assert_eq!(payable_amount(&t), 80.0);
        t.estimated_quote = None;
        assert_eq!(payable_amount(&t), 0.0);
    }

    #[test]
    fn points_are_floored() {
        let c = cfg();
        assert_eq!(points_for_amount(100.0, &c), 1000);
        assert_eq!(points_for_amount(99.99, &c), 999);
        assert_eq!(points_for_amount(0.05, &c), 0);
    }

    #[test]
    fn unlocked_rewards_report_crossed_thresholds_only() {
        let c = cfg();
        assert_eq!(rewards_unlocked(0, 999, &c), Vec::<String>::new());
        assert_eq!(rewards_unlocked(900, 1200, &c), vec!["film"]);
        assert_eq!(rewards_unlocked(900, 2500, &c), vec!["film", "discount"]);
        // Already past film: crossing only discount.
        assert_eq!(rewards_unlocked(1500, 2100, &c), vec!["discount"]);
        // No crossing when already above both.
        assert_eq!(rewards_unlocked(2500, 3000, &c), Vec::<String>::new());
    }

    #[test]
    fn next_reward_projection() {
        let c = cfg();
        let n = next_reward(400, &c);
        assert_eq!(n.reward, "film");
        assert_eq!(n.points_missing, 600);

        // Film reached: it is redeemable now, missing 0.
        let n = next_reward(1200, &c);
        assert_eq!(n.reward, "film");
        assert_eq!(n.points_missing, 0);
    }

    #[test]
    fn redemption_description_carries_voucher_value() {
        let c = cfg();
        assert_eq!(Reward::Discount.description(&c), "10€ voucher");
        assert_eq!(Reward::Discount.ledger_kind(), "redemption:discount");
        assert_eq!(Reward::Film.ledger_kind(), "redemption:film");
    }
}
