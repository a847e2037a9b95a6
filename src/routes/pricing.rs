// src/routes/pricing.rs

use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::pricing::{self, DeviceClass, PartCategory, QualityTier};

#[derive(Deserialize)]
pub struct RetailPriceBody {
    pub cost: f64,
    #[serde(default)]
    pub device_class: DeviceClass,
    #[serde(default)]
    pub category: PartCategory,
    #[serde(default)]
    pub tier: QualityTier,
}

#[derive(Serialize)]
pub struct RetailPrice {
    pub price: i64,
}

/// POST /api/v1/pricing/retail
pub async fn retail_price(Json(b): Json<RetailPriceBody>) -> Result<Json<RetailPrice>, ApiError> {
    if !b.cost.is_finite() || b.cost <= 0.0 {
        return Err(ApiError::BadRequest("cost must be a positive number".into()));
    }
    let price = pricing::retail_price(b.cost, b.device_class, b.category, b.tier);
    Ok(Json(RetailPrice { price }))
}
