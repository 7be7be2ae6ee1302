use crate::domain::model::{AircraftType, FuelQuantities, FuelTank};
use crate::utils::error::{AgentError, Result};
use crate::utils::validation::validate_non_negative;
use serde::{Deserialize, Serialize};

/// 油箱加油優先順序。同一組內依容量比例分配，左右對稱油箱因此等量。
pub const TANK_PRIORITY: [&[FuelTank]; 7] = [
    &[FuelTank::LeftMain, FuelTank::RightMain],
    &[FuelTank::LeftAux, FuelTank::RightAux],
    &[FuelTank::LeftTip, FuelTank::RightTip],
    &[FuelTank::Center],
    &[FuelTank::Center2],
    &[FuelTank::Center3],
    &[FuelTank::External1, FuelTank::External2],
];

/// 最終備份油量以巡航油耗計算的分鐘數
pub const FINAL_RESERVE_MINUTES: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelDistribution {
    pub tanks: FuelQuantities,
    pub requested_lbs: f64,
    /// 超出總容量而無法裝載的油量
    pub unallocated_lbs: f64,
}

impl FuelDistribution {
    pub fn loaded_lbs(&self) -> f64 {
        self.tanks.total()
    }
}

/// 依固定優先順序把 `total_lbs` 分配到各油箱
pub fn distribute_fuel(total_lbs: f64, capacities: &FuelQuantities) -> Result<FuelDistribution> {
    validate_non_negative("fuel.total_lbs", total_lbs)?;
    for tank in FuelTank::ALL {
        validate_non_negative(&format!("fuel_capacity.{}", tank), capacities.get(tank))?;
    }

    let mut tanks = FuelQuantities::default();
    let mut remaining = total_lbs;

    for group in TANK_PRIORITY {
        if remaining <= 0.0 {
            break;
        }

        let group_capacity: f64 = group.iter().map(|tank| capacities.get(*tank)).sum();
        if group_capacity <= 0.0 {
            continue;
        }

        if remaining >= group_capacity {
            for tank in group.iter() {
                tanks.set(*tank, capacities.get(*tank));
            }
            remaining -= group_capacity;
        } else {
            let ratio = remaining / group_capacity;
            for tank in group.iter() {
                tanks.set(*tank, capacities.get(*tank) * ratio);
            }
            remaining = 0.0;
        }
    }

    // 浮點誤差可能讓總和略高於請求量
    let loaded = tanks.total();
    if loaded > total_lbs {
        let scale = total_lbs / loaded;
        for tank in FuelTank::ALL {
            tanks.set(tank, tanks.get(tank) * scale);
        }
    }

    if remaining > 0.0 {
        tracing::warn!(
            "⛽ Requested {:.0} lbs exceeds tank capacity, {:.0} lbs not loaded",
            total_lbs,
            remaining
        );
    }

    Ok(FuelDistribution {
        tanks,
        requested_lbs: total_lbs,
        unallocated_lbs: remaining.max(0.0),
    })
}

/// OFP 燃油計畫
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPlan {
    pub taxi_lbs: f64,
    pub trip_lbs: f64,
    pub contingency_percent: f64,
    pub alternate_lbs: f64,
    pub final_reserve_lbs: f64,
    pub extra_lbs: f64,
}

impl FuelPlan {
    /// 依距離、巡航速度與油耗估算
    pub fn estimate(aircraft: &AircraftType, distance_nm: f64, alternate_nm: f64, extra_lbs: f64) -> Result<Self> {
        validate_non_negative("distance_nm", distance_nm)?;
        validate_non_negative("alternate_nm", alternate_nm)?;
        validate_non_negative("extra_lbs", extra_lbs)?;
        if aircraft.cruise_speed_kts <= 0.0 {
            return Err(AgentError::invalid_input(
                "aircraft.cruise_speed_kts",
                "cruise speed must be positive",
            ));
        }
        validate_non_negative("aircraft.fuel_flow_lbs_per_hour", aircraft.fuel_flow_lbs_per_hour)?;

        let lbs_per_nm = aircraft.fuel_flow_lbs_per_hour / aircraft.cruise_speed_kts;

        Ok(Self {
            taxi_lbs: aircraft.taxi_fuel_lbs,
            trip_lbs: distance_nm * lbs_per_nm,
            contingency_percent: aircraft.contingency_percent,
            alternate_lbs: alternate_nm * lbs_per_nm,
            final_reserve_lbs: aircraft.fuel_flow_lbs_per_hour * FINAL_RESERVE_MINUTES / 60.0,
            extra_lbs,
        })
    }

    pub fn contingency_lbs(&self) -> f64 {
        self.trip_lbs * self.contingency_percent / 100.0
    }

    /// 起飛所需油量 (不含滑行)
    pub fn takeoff_fuel(&self) -> f64 {
        self.trip_lbs + self.contingency_lbs() + self.alternate_lbs + self.final_reserve_lbs + self.extra_lbs
    }

    pub fn block_fuel(&self) -> f64 {
        self.taxi_lbs + self.takeoff_fuel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn airliner_tanks() -> FuelQuantities {
        FuelQuantities {
            left_main: 8_600.0,
            right_main: 8_600.0,
            center: 28_800.0,
            ..Default::default()
        }
    }

    fn assert_invariants(distribution: &FuelDistribution, capacities: &FuelQuantities) {
        assert!(distribution.loaded_lbs() <= distribution.requested_lbs + 1e-9);
        for tank in FuelTank::ALL {
            assert!(distribution.tanks.get(tank) <= capacities.get(tank) + 1e-9);
            assert!(distribution.tanks.get(tank) >= 0.0);
        }
    }

    #[test]
    fn test_mains_fill_first() {
        let capacities = airliner_tanks();
        let result = distribute_fuel(10_000.0, &capacities).unwrap();

        assert_abs_diff_eq!(result.tanks.left_main, 5_000.0);
        assert_abs_diff_eq!(result.tanks.right_main, 5_000.0);
        assert_eq!(result.tanks.center, 0.0);
        assert_eq!(result.unallocated_lbs, 0.0);
        assert_invariants(&result, &capacities);
    }

    #[test]
    fn test_overflow_to_center() {
        let capacities = airliner_tanks();
        let result = distribute_fuel(20_000.0, &capacities).unwrap();

        assert_abs_diff_eq!(result.tanks.left_main, 8_600.0);
        assert_abs_diff_eq!(result.tanks.right_main, 8_600.0);
        assert_abs_diff_eq!(result.tanks.center, 2_800.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.loaded_lbs(), 20_000.0, epsilon = 1e-6);
        assert_invariants(&result, &capacities);
    }

    #[test]
    fn test_request_exceeds_capacity() {
        let capacities = airliner_tanks();
        let result = distribute_fuel(50_000.0, &capacities).unwrap();

        assert_abs_diff_eq!(result.loaded_lbs(), 46_000.0);
        assert_abs_diff_eq!(result.unallocated_lbs, 4_000.0);
        assert_invariants(&result, &capacities);
    }

    #[test]
    fn test_asymmetric_group_is_proportional() {
        let capacities = FuelQuantities {
            left_aux: 100.0,
            right_aux: 300.0,
            ..Default::default()
        };
        let result = distribute_fuel(200.0, &capacities).unwrap();

        assert_abs_diff_eq!(result.tanks.left_aux, 50.0);
        assert_abs_diff_eq!(result.tanks.right_aux, 150.0);
    }

    #[test]
    fn test_priority_order_across_groups() {
        let capacities = FuelQuantities {
            left_main: 100.0,
            right_main: 100.0,
            left_tip: 50.0,
            right_tip: 50.0,
            center: 500.0,
            external1: 200.0,
            ..Default::default()
        };
        let result = distribute_fuel(350.0, &capacities).unwrap();

        assert_abs_diff_eq!(result.tanks.left_tip, 50.0);
        assert_abs_diff_eq!(result.tanks.center, 50.0);
        assert_eq!(result.tanks.external1, 0.0);
        assert_invariants(&result, &capacities);
    }

    #[test]
    fn test_invalid_requests() {
        let capacities = airliner_tanks();
        assert!(distribute_fuel(-1.0, &capacities).is_err());
        assert!(distribute_fuel(f64::NAN, &capacities).is_err());

        let negative = FuelQuantities {
            center: -5.0,
            ..Default::default()
        };
        assert!(distribute_fuel(10.0, &negative).is_err());
    }

    #[test]
    fn test_zero_request() {
        let result = distribute_fuel(0.0, &airliner_tanks()).unwrap();
        assert_eq!(result.loaded_lbs(), 0.0);
    }

    #[test]
    fn test_fuel_plan_estimate() {
        let aircraft = AircraftType {
            name: "Test Jet".to_string(),
            icao: "TJET".to_string(),
            empty_weight_lbs: 90_000.0,
            empty_arm_in: None,
            max_gross_weight_lbs: 174_000.0,
            max_zero_fuel_weight_lbs: None,
            cruise_speed_kts: 450.0,
            fuel_flow_lbs_per_hour: 5_400.0,
            taxi_fuel_lbs: 400.0,
            contingency_percent: 5.0,
            fuel_capacity: airliner_tanks(),
            fuel_arm_in: None,
            crew_weight_lbs: 0.0,
            payload_stations: vec![],
        };

        let plan = FuelPlan::estimate(&aircraft, 900.0, 150.0, 0.0).unwrap();

        // 5400 / 450 = 12 lbs/nm
        assert_abs_diff_eq!(plan.trip_lbs, 10_800.0);
        assert_abs_diff_eq!(plan.contingency_lbs(), 540.0);
        assert_abs_diff_eq!(plan.alternate_lbs, 1_800.0);
        assert_abs_diff_eq!(plan.final_reserve_lbs, 2_700.0);
        assert_abs_diff_eq!(plan.block_fuel(), 400.0 + 10_800.0 + 540.0 + 1_800.0 + 2_700.0);

        assert!(FuelPlan::estimate(&aircraft, -1.0, 0.0, 0.0).is_err());
    }
}
