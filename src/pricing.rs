// src/pricing.rs
//
// Deterministic retail pricing: supplier cost → shelf price ending in 9.
// Pure and stateless; used by the pricing endpoint and by catalog recompute
// jobs living outside this service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Phone,
    Tablet,
    Laptop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    Screen,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    #[default]
    Standard,
    HighEnd,
    Foldable,
}

/// Rounds up to the nearest integer ending in digit 9.
pub fn round_up_9(x: f64) -> i64 {
    let tens = (x / 10.0).floor() as i64;
    let candidate = tens * 10 + 9;
    if candidate as f64 >= x {
        candidate
    } else {
        candidate + 10
    }
}

/// Additive margin on top of cost×1.2. Screen tiers only matter for phones;
/// the tablet and laptop variants differ from the phone one only in this
/// constant.
fn margin(device: DeviceClass, category: PartCategory, tier: QualityTier) -> f64 {
    match device {
        DeviceClass::Phone => match (category, tier) {
            (PartCategory::Screen, QualityTier::HighEnd) => 70.0,
            (PartCategory::Screen, QualityTier::Foldable) => 100.0,
            _ => 60.0,
        },
        DeviceClass::Tablet => 110.0,
        DeviceClass::Laptop => 120.0,
    }
}

/// Supplier cost → retail price. Caller guarantees a positive cost.
pub fn retail_price(
    cost: f64,
    device: DeviceClass,
    category: PartCategory,
    tier: QualityTier,
) -> i64 {
    round_up_9(cost * 1.2 + margin(device, category, tier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_9_reference_values() {
        for (input, expected) in [
            (61.0, 69),
            (72.0, 79),
            (83.0, 89),
            (90.0, 99),
            (91.0, 99),
            (101.0, 109),
            (145.0, 149),
            (146.4, 149),
            (102.0, 109),
        ] {
            assert_eq!(round_up_9(input), expected, "round_up_9({input})");
        }
    }

    #[test]
    fn round_up_9_properties() {
        for i in 1..500 {
            let x = i as f64 * 0.7;
            let r = round_up_9(x);
            assert_eq!(r.rem_euclid(10), 9);
            assert!(r as f64 >= x);
            assert!((r as f64) < x + 10.0);
        }
    }

    #[test]
    fn already_ending_in_nine_stays_put() {
        assert_eq!(round_up_9(69.0), 69);
        assert_eq!(round_up_9(149.0), 149);
    }

    #[test]
    fn phone_screen_tiers() {
        // 72×1.2 + 60 = 146.4 → 149
        assert_eq!(
            retail_price(72.0, DeviceClass::Phone, PartCategory::Screen, QualityTier::Standard),
            149
        );
        // 72×1.2 + 70 = 156.4 → 159
        assert_eq!(
            retail_price(72.0, DeviceClass::Phone, PartCategory::Screen, QualityTier::HighEnd),
            159
        );
        // 72×1.2 + 100 = 186.4 → 189
        assert_eq!(
            retail_price(72.0, DeviceClass::Phone, PartCategory::Screen, QualityTier::Foldable),
            189
        );
    }

    #[test]
    fn non_screen_parts_ignore_tier() {
        // 35×1.2 + 60 = 102 → 109
        for tier in [QualityTier::Standard, QualityTier::HighEnd, QualityTier::Foldable] {
            assert_eq!(
                retail_price(35.0, DeviceClass::Phone, PartCategory::Other, tier),
                109
            );
        }
    }

    #[test]
    fn tablet_and_laptop_variants_shift_only_the_constant() {
        // 50×1.2 + 110 = 170 → 179 ; 50×1.2 + 120 = 180 → 189
        assert_eq!(
            retail_price(50.0, DeviceClass::Tablet, PartCategory::Screen, QualityTier::Standard),
            179
        );
        assert_eq!(
            retail_price(50.0, DeviceClass::Laptop, PartCategory::Screen, QualityTier::Standard),
            189
        );
    }
}
