use crate::domain::model::{PayloadStation, StationKind};
use crate::utils::error::Result;
use crate::utils::validation::validate_non_negative;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadDistribution {
    /// 與站位清單同順序的重量 (lbs)
    pub stations: Vec<f64>,
    pub requested_lbs: f64,
    pub unallocated_lbs: f64,
}

impl PayloadDistribution {
    pub fn loaded_lbs(&self) -> f64 {
        self.stations.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadRequest {
    pub crew_lbs: f64,
    pub passengers_lbs: f64,
    pub cargo_lbs: f64,
}

impl PayloadRequest {
    pub fn total(&self) -> f64 {
        self.crew_lbs + self.passengers_lbs + self.cargo_lbs
    }
}

/// 依剩餘容量比例裝入指定站位，回傳裝不下的重量
fn fill_proportional(indices: &[usize], amount: f64, stations: &[PayloadStation], loads: &mut [f64]) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }

    let free: Vec<f64> = indices
        .iter()
        .map(|i| (stations[*i].max_weight_lbs - loads[*i]).max(0.0))
        .collect();
    let group_free: f64 = free.iter().sum();
    if group_free <= 0.0 {
        return amount;
    }

    if amount >= group_free {
        for (i, f) in indices.iter().zip(&free) {
            loads[*i] += f;
        }
        amount - group_free
    } else {
        let ratio = amount / group_free;
        for (i, f) in indices.iter().zip(&free) {
            loads[*i] += f * ratio;
        }
        0.0
    }
}

/// 組員 → 乘客 → 貨物，貨物溢出時改裝到剩餘的客艙站位
pub fn distribute_payload(stations: &[PayloadStation], request: &PayloadRequest) -> Result<PayloadDistribution> {
    validate_non_negative("payload.crew_lbs", request.crew_lbs)?;
    validate_non_negative("payload.passengers_lbs", request.passengers_lbs)?;
    validate_non_negative("payload.cargo_lbs", request.cargo_lbs)?;
    for station in stations {
        validate_non_negative(&format!("payload_station.{}", station.name), station.max_weight_lbs)?;
    }

    let indices_of = |kind: StationKind| -> Vec<usize> {
        stations
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind() == kind)
            .map(|(i, _)| i)
            .collect()
    };
    let crew = indices_of(StationKind::Crew);
    let passengers = indices_of(StationKind::Passenger);
    let cargo = indices_of(StationKind::Cargo);

    let mut loads = vec![0.0; stations.len()];
    let mut unallocated = 0.0;

    unallocated += fill_proportional(&crew, request.crew_lbs, stations, &mut loads);
    unallocated += fill_proportional(&passengers, request.passengers_lbs, stations, &mut loads);
    let cargo_overflow = fill_proportional(&cargo, request.cargo_lbs, stations, &mut loads);
    unallocated += fill_proportional(&passengers, cargo_overflow, stations, &mut loads);

    // 浮點誤差可能讓站位略超出上限
    for (load, station) in loads.iter_mut().zip(stations) {
        *load = load.min(station.max_weight_lbs);
    }

    if unallocated > 0.0 {
        tracing::warn!("📦 {:.0} lbs of payload does not fit the available stations", unallocated);
    }

    Ok(PayloadDistribution {
        stations: loads,
        requested_lbs: request.total(),
        unallocated_lbs: unallocated,
    })
}

/// 由 (重量, 力臂) 計算重心；總重為零時回傳 `None`
pub fn center_of_gravity(items: &[(f64, f64)]) -> Option<f64> {
    let weight: f64 = items.iter().map(|(w, _)| w).sum();
    if weight <= 0.0 {
        return None;
    }
    let moment: f64 = items.iter().map(|(w, arm)| w * arm).sum();
    Some(moment / weight)
}

/// 已裝載站位的 (重量, 力臂)；有重量但缺少力臂時回傳 `None`
pub fn payload_moments(stations: &[PayloadStation], loads: &[f64]) -> Option<Vec<(f64, f64)>> {
    stations
        .iter()
        .zip(loads)
        .filter(|(_, load)| **load > 0.0)
        .map(|(station, load)| station.arm_in.map(|arm| (*load, arm)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn station(name: &str, max: f64, arm: Option<f64>) -> PayloadStation {
        PayloadStation {
            name: name.to_string(),
            max_weight_lbs: max,
            arm_in: arm,
            kind: None,
        }
    }

    fn cabin() -> Vec<PayloadStation> {
        vec![
            station("Pilot", 200.0, Some(37.0)),
            station("Row 1", 400.0, Some(73.0)),
            station("Row 2", 400.0, Some(95.0)),
            station("Baggage", 100.0, Some(123.0)),
        ]
    }

    fn assert_invariants(result: &PayloadDistribution, stations: &[PayloadStation]) {
        assert!(result.loaded_lbs() <= result.requested_lbs + 1e-9);
        for (load, station) in result.stations.iter().zip(stations) {
            assert!(*load <= station.max_weight_lbs + 1e-9);
            assert!(*load >= 0.0);
        }
    }

    #[test]
    fn test_passengers_spread_evenly() {
        let stations = cabin();
        let request = PayloadRequest {
            crew_lbs: 180.0,
            passengers_lbs: 400.0,
            cargo_lbs: 50.0,
        };
        let result = distribute_payload(&stations, &request).unwrap();

        assert_abs_diff_eq!(result.stations[0], 180.0);
        assert_abs_diff_eq!(result.stations[1], 200.0);
        assert_abs_diff_eq!(result.stations[2], 200.0);
        assert_abs_diff_eq!(result.stations[3], 50.0);
        assert_eq!(result.unallocated_lbs, 0.0);
        assert_invariants(&result, &stations);
    }

    #[test]
    fn test_cargo_overflows_into_cabin() {
        let stations = cabin();
        let request = PayloadRequest {
            crew_lbs: 0.0,
            passengers_lbs: 600.0,
            cargo_lbs: 300.0,
        };
        let result = distribute_payload(&stations, &request).unwrap();

        assert_abs_diff_eq!(result.stations[3], 100.0);
        // 600 乘客 + 200 溢出貨物 = 800，剛好填滿兩排
        assert_abs_diff_eq!(result.stations[1], 400.0);
        assert_abs_diff_eq!(result.stations[2], 400.0);
        assert_abs_diff_eq!(result.unallocated_lbs, 0.0);
        assert_invariants(&result, &stations);
    }

    #[test]
    fn test_excess_is_unallocated() {
        let stations = cabin();
        let request = PayloadRequest {
            crew_lbs: 250.0,
            passengers_lbs: 900.0,
            cargo_lbs: 150.0,
        };
        let result = distribute_payload(&stations, &request).unwrap();

        assert_abs_diff_eq!(result.loaded_lbs(), 1_100.0);
        assert_abs_diff_eq!(result.unallocated_lbs, 50.0 + 100.0 + 50.0);
        assert_invariants(&result, &stations);
    }

    #[test]
    fn test_rejects_negative_weights() {
        let request = PayloadRequest {
            crew_lbs: 0.0,
            passengers_lbs: -1.0,
            cargo_lbs: 0.0,
        };
        assert!(distribute_payload(&cabin(), &request).is_err());
    }

    #[test]
    fn test_center_of_gravity() {
        assert_abs_diff_eq!(center_of_gravity(&[(100.0, 10.0), (100.0, 20.0)]).unwrap(), 15.0);
        assert!(center_of_gravity(&[]).is_none());

        let stations = cabin();
        let moments = payload_moments(&stations, &[180.0, 0.0, 0.0, 50.0]).unwrap();
        assert_eq!(moments, vec![(180.0, 37.0), (50.0, 123.0)]);

        let no_arm = vec![station("Row 1", 400.0, None)];
        assert!(payload_moments(&no_arm, &[100.0]).is_none());
    }
}
