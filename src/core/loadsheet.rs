use crate::core::fuel::{distribute_fuel, FuelDistribution, FuelPlan};
use crate::core::payload::{center_of_gravity, distribute_payload, payload_moments, PayloadDistribution, PayloadRequest};
use crate::domain::model::{AircraftType, FuelTank};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadWarning {
    MaxGrossWeightExceeded { actual_lbs: f64, limit_lbs: f64 },
    MaxZeroFuelWeightExceeded { actual_lbs: f64, limit_lbs: f64 },
    FuelNotLoaded { lbs: f64 },
    PayloadNotLoaded { lbs: f64 },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MaxGrossWeightExceeded { actual_lbs, limit_lbs } => {
                write!(f, "takeoff weight {:.0} lbs exceeds MTOW {:.0} lbs", actual_lbs, limit_lbs)
            }
            LoadWarning::MaxZeroFuelWeightExceeded { actual_lbs, limit_lbs } => {
                write!(f, "zero fuel weight {:.0} lbs exceeds MZFW {:.0} lbs", actual_lbs, limit_lbs)
            }
            LoadWarning::FuelNotLoaded { lbs } => write!(f, "{:.0} lbs of fuel exceeds tank capacity", lbs),
            LoadWarning::PayloadNotLoaded { lbs } => write!(f, "{:.0} lbs of payload has no station", lbs),
        }
    }
}

/// 裝載表：燃油計畫、油箱分配與酬載分配的總結
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSheet {
    pub aircraft: String,
    pub fuel_plan: FuelPlan,
    pub fuel: FuelDistribution,
    pub payload: PayloadDistribution,
    pub empty_weight_lbs: f64,
    pub zero_fuel_weight_lbs: f64,
    pub ramp_weight_lbs: f64,
    pub takeoff_weight_lbs: f64,
    pub landing_weight_lbs: f64,
    /// 起飛前重心 (inches)，缺少力臂資料時為 `None`
    pub cg_in: Option<f64>,
    pub warnings: Vec<LoadWarning>,
}

impl LoadSheet {
    pub fn build(
        aircraft: &AircraftType,
        fuel_plan: FuelPlan,
        fuel: FuelDistribution,
        payload: PayloadDistribution,
    ) -> Self {
        let empty = aircraft.empty_weight_lbs;
        let zero_fuel = empty + payload.loaded_lbs();
        let ramp = zero_fuel + fuel.loaded_lbs();
        let takeoff = (ramp - fuel_plan.taxi_lbs).max(zero_fuel);
        let landing = (takeoff - fuel_plan.trip_lbs).max(zero_fuel);

        let mut warnings = Vec::new();
        // MTOW 以滑行後的起飛重量比較，滑行油可超出
        if takeoff > aircraft.max_gross_weight_lbs {
            warnings.push(LoadWarning::MaxGrossWeightExceeded {
                actual_lbs: takeoff,
                limit_lbs: aircraft.max_gross_weight_lbs,
            });
        }
        if let Some(mzfw) = aircraft.max_zero_fuel_weight_lbs {
            if zero_fuel > mzfw {
                warnings.push(LoadWarning::MaxZeroFuelWeightExceeded {
                    actual_lbs: zero_fuel,
                    limit_lbs: mzfw,
                });
            }
        }
        if fuel.unallocated_lbs > 0.0 {
            warnings.push(LoadWarning::FuelNotLoaded { lbs: fuel.unallocated_lbs });
        }
        if payload.unallocated_lbs > 0.0 {
            warnings.push(LoadWarning::PayloadNotLoaded {
                lbs: payload.unallocated_lbs,
            });
        }

        let cg_in = ramp_center_of_gravity(aircraft, &fuel, &payload);

        for warning in &warnings {
            tracing::warn!("⚠️ {}: {}", aircraft.icao, warning);
        }

        Self {
            aircraft: aircraft.icao.clone(),
            fuel_plan,
            fuel,
            payload,
            empty_weight_lbs: empty,
            zero_fuel_weight_lbs: zero_fuel,
            ramp_weight_lbs: ramp,
            takeoff_weight_lbs: takeoff,
            landing_weight_lbs: landing,
            cg_in,
            warnings,
        }
    }

    /// 依航程與酬載直接產生完整裝載表
    pub fn suggest(
        aircraft: &AircraftType,
        distance_nm: f64,
        alternate_nm: f64,
        extra_fuel_lbs: f64,
        request: &PayloadRequest,
    ) -> Result<Self> {
        let plan = FuelPlan::estimate(aircraft, distance_nm, alternate_nm, extra_fuel_lbs)?;
        let fuel = distribute_fuel(plan.block_fuel(), &aircraft.fuel_capacity)?;
        let payload = distribute_payload(&aircraft.payload_stations, request)?;

        tracing::info!(
            "🧮 {} block fuel {:.0} lbs, payload {:.0} lbs",
            aircraft.icao,
            plan.block_fuel(),
            payload.loaded_lbs()
        );

        Ok(Self::build(aircraft, plan, fuel, payload))
    }

    pub fn is_within_limits(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn ramp_center_of_gravity(
    aircraft: &AircraftType,
    fuel: &FuelDistribution,
    payload: &PayloadDistribution,
) -> Option<f64> {
    let mut items = vec![(aircraft.empty_weight_lbs, aircraft.empty_arm_in?)];
    items.extend(payload_moments(&aircraft.payload_stations, &payload.stations)?);

    if fuel.loaded_lbs() > 0.0 {
        let arms = aircraft.fuel_arm_in.as_ref()?;
        items.extend(
            FuelTank::ALL
                .iter()
                .map(|tank| (fuel.tanks.get(*tank), arms.get(*tank)))
                .filter(|(lbs, _)| *lbs > 0.0),
        );
    }

    center_of_gravity(&items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FuelQuantities, PayloadStation};
    use approx::assert_abs_diff_eq;

    fn cessna() -> AircraftType {
        AircraftType {
            name: "Cessna 172".to_string(),
            icao: "C172".to_string(),
            empty_weight_lbs: 1_680.0,
            empty_arm_in: Some(39.0),
            max_gross_weight_lbs: 2_550.0,
            max_zero_fuel_weight_lbs: None,
            cruise_speed_kts: 120.0,
            fuel_flow_lbs_per_hour: 48.0,
            taxi_fuel_lbs: 6.0,
            contingency_percent: 5.0,
            fuel_capacity: FuelQuantities {
                left_main: 168.0,
                right_main: 168.0,
                ..Default::default()
            },
            fuel_arm_in: Some(FuelQuantities {
                left_main: 48.0,
                right_main: 48.0,
                ..Default::default()
            }),
            crew_weight_lbs: 190.0,
            payload_stations: vec![
                PayloadStation {
                    name: "Pilot".to_string(),
                    max_weight_lbs: 300.0,
                    arm_in: Some(37.0),
                    kind: None,
                },
                PayloadStation {
                    name: "Rear Seats".to_string(),
                    max_weight_lbs: 400.0,
                    arm_in: Some(73.0),
                    kind: None,
                },
                PayloadStation {
                    name: "Baggage".to_string(),
                    max_weight_lbs: 120.0,
                    arm_in: Some(95.0),
                    kind: None,
                },
            ],
        }
    }

    #[test]
    fn test_suggest_within_limits() {
        let aircraft = cessna();
        let request = PayloadRequest {
            crew_lbs: 190.0,
            passengers_lbs: 170.0,
            cargo_lbs: 30.0,
        };
        let sheet = LoadSheet::suggest(&aircraft, 240.0, 0.0, 0.0, &request).unwrap();

        // 48 / 120 = 0.4 lbs/nm → 96 trip, 4.8 contingency, 24 reserve, 6 taxi
        assert_abs_diff_eq!(sheet.fuel_plan.block_fuel(), 130.8, epsilon = 1e-9);
        assert_abs_diff_eq!(sheet.zero_fuel_weight_lbs, 1_680.0 + 390.0);
        assert_abs_diff_eq!(sheet.ramp_weight_lbs, 1_680.0 + 390.0 + 130.8, epsilon = 1e-9);
        assert_abs_diff_eq!(sheet.takeoff_weight_lbs, sheet.ramp_weight_lbs - 6.0, epsilon = 1e-9);
        assert!(sheet.is_within_limits());

        let cg = sheet.cg_in.unwrap();
        assert!(cg > 37.0 && cg < 95.0);
    }

    #[test]
    fn test_overweight_is_flagged() {
        let aircraft = cessna();
        let request = PayloadRequest {
            crew_lbs: 300.0,
            passengers_lbs: 400.0,
            cargo_lbs: 200.0,
        };
        let sheet = LoadSheet::suggest(&aircraft, 2_000.0, 100.0, 0.0, &request).unwrap();

        assert!(sheet
            .warnings
            .iter()
            .any(|w| matches!(w, LoadWarning::MaxGrossWeightExceeded { .. })));
        assert!(sheet.warnings.iter().any(|w| matches!(w, LoadWarning::FuelNotLoaded { .. })));
        assert!(sheet
            .warnings
            .iter()
            .any(|w| matches!(w, LoadWarning::PayloadNotLoaded { lbs } if (*lbs - 80.0).abs() < 1e-9)));
    }

    #[test]
    fn test_mtow_is_checked_against_takeoff_weight() {
        let request = PayloadRequest {
            crew_lbs: 190.0,
            passengers_lbs: 170.0,
            cargo_lbs: 30.0,
        };

        // ramp 2200.8、takeoff 2194.8
        let mut aircraft = cessna();
        aircraft.max_gross_weight_lbs = 2_198.0;
        let sheet = LoadSheet::suggest(&aircraft, 240.0, 0.0, 0.0, &request).unwrap();
        assert!(sheet.ramp_weight_lbs > aircraft.max_gross_weight_lbs);
        assert!(sheet.is_within_limits());

        aircraft.max_gross_weight_lbs = 2_190.0;
        let sheet = LoadSheet::suggest(&aircraft, 240.0, 0.0, 0.0, &request).unwrap();
        match sheet.warnings.as_slice() {
            [LoadWarning::MaxGrossWeightExceeded { actual_lbs, limit_lbs }] => {
                assert_abs_diff_eq!(*actual_lbs, 2_194.8, epsilon = 1e-9);
                assert_abs_diff_eq!(*limit_lbs, 2_190.0);
            }
            other => panic!("unexpected warnings: {:?}", other),
        }
        assert_eq!(
            sheet.warnings[0].to_string(),
            "takeoff weight 2195 lbs exceeds MTOW 2190 lbs"
        );
    }

    #[test]
    fn test_cg_requires_arms() {
        let mut aircraft = cessna();
        aircraft.fuel_arm_in = None;
        let sheet = LoadSheet::suggest(&aircraft, 100.0, 0.0, 0.0, &PayloadRequest::default()).unwrap();
        assert!(sheet.cg_in.is_none());
    }

    #[test]
    fn test_mzfw_warning() {
        let mut aircraft = cessna();
        aircraft.max_zero_fuel_weight_lbs = Some(1_800.0);
        let request = PayloadRequest {
            crew_lbs: 200.0,
            ..Default::default()
        };
        let sheet = LoadSheet::suggest(&aircraft, 50.0, 0.0, 0.0, &request).unwrap();
        assert!(matches!(
            sheet.warnings[0],
            LoadWarning::MaxZeroFuelWeightExceeded { .. }
        ));
    }
}
