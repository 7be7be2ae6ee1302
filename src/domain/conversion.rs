use crate::utils::units;
use serde::{Deserialize, Serialize};

/// 從模擬器原始值轉換為模型單位的方式
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    #[default]
    Identity,
    MetersToFeet,
    MpsToKnots,
    MpsToFpm,
    FpsToFpm,
    KgToLbs,
    /// 需要當前的每加侖燃油重量
    GallonsToLbs,
    RadiansToDegrees,
    /// 開關量，原始值 > 0.5 視為開啟
    Bool,
    Scale(f64),
}

impl Conversion {
    pub fn apply(&self, raw: f64, lbs_per_gallon: f64) -> f64 {
        match self {
            Conversion::Identity => raw,
            Conversion::MetersToFeet => units::meters_to_feet(raw),
            Conversion::MpsToKnots => units::mps_to_knots(raw),
            Conversion::MpsToFpm => units::mps_to_fpm(raw),
            Conversion::FpsToFpm => units::fps_to_fpm(raw),
            Conversion::KgToLbs => units::kg_to_lbs(raw),
            Conversion::GallonsToLbs => units::gallons_to_lbs(raw, lbs_per_gallon),
            Conversion::RadiansToDegrees => raw.to_degrees(),
            Conversion::Bool => {
                if raw > 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Conversion::Scale(factor) => raw * factor,
        }
    }

    /// 反向轉換，寫回模擬器時使用
    pub fn invert(&self, value: f64, lbs_per_gallon: f64) -> f64 {
        match self {
            Conversion::Identity | Conversion::Bool => value,
            Conversion::MetersToFeet => units::feet_to_meters(value),
            Conversion::MpsToKnots => units::knots_to_mps(value),
            Conversion::MpsToFpm => units::fpm_to_mps(value),
            Conversion::FpsToFpm => units::fpm_to_fps(value),
            Conversion::KgToLbs => units::lbs_to_kg(value),
            Conversion::GallonsToLbs => units::lbs_to_gallons(value, lbs_per_gallon),
            Conversion::RadiansToDegrees => value.to_radians(),
            Conversion::Scale(factor) => {
                if *factor == 0.0 {
                    0.0
                } else {
                    value / factor
                }
            }
        }
    }
}
