// src/config.rs

use std::env;

/// Loyalty-program knobs, read once at startup. Every key has a default so a
/// missing or unparsable value never fails the caller.
#[derive(Debug, Clone)]
pub struct LoyaltyConfig {
    pub enabled: bool,
    pub points_per_euro: i64,
    pub film_threshold: i64,
    pub discount_threshold: i64,
    pub discount_value_eur: f64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            points_per_euro: 10,
            film_threshold: 1000,
            discount_threshold: 2000,
            discount_value_eur: 10.0,
        }
    }
}

impl LoyaltyConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            enabled: env_parse("LOYALTY_ENABLED", d.enabled),
            points_per_euro: env_parse("LOYALTY_POINTS_PER_EURO", d.points_per_euro),
            film_threshold: env_parse("LOYALTY_FILM_THRESHOLD", d.film_threshold),
            discount_threshold: env_parse("LOYALTY_DISCOUNT_THRESHOLD", d.discount_threshold),
            discount_value_eur: env_parse("LOYALTY_DISCOUNT_VALUE_EUR", d.discount_value_eur),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Webhook endpoint for the notification collaborator; notifications are
/// skipped entirely when unset.
pub fn notify_webhook_url() -> Option<String> {
    env::var("NOTIFY_WEBHOOK_URL").ok().filter(|s| !s.is_empty())
}
