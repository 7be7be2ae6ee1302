use crate::adapters::mapping::{Binding, MappingTable};
use crate::domain::conversion::Conversion;
use crate::domain::fields::TelemetryField as F;
use crate::domain::model::{FuelTank, Light};

/// X-Plane 11 預設 dataref 對應表
///
/// 油箱索引依機型而異，這裡採用 Laminar 737 的配置 (左、中、右)，
/// 其他機型請在設定檔中覆蓋 `fuel_tank.*`。
pub fn default_table() -> MappingTable {
    use Conversion::*;

    let mut bindings = vec![
        Binding::new("sim/flightmodel/position/latitude", F::Latitude, Identity),
        Binding::new("sim/flightmodel/position/longitude", F::Longitude, Identity),
        Binding::new("sim/flightmodel/position/elevation", F::AltitudeFt, MetersToFeet),
        Binding::new("sim/flightmodel/position/y_agl", F::AltitudeAglFt, MetersToFeet),
        Binding::new("sim/flightmodel/position/psi", F::HeadingTrue, Identity),
        Binding::new("sim/flightmodel/position/mag_psi", F::HeadingMagnetic, Identity),
        Binding::new("sim/flightmodel/position/indicated_airspeed", F::IndicatedAirspeed, Identity),
        Binding::new("sim/flightmodel/position/true_airspeed", F::TrueAirspeed, MpsToKnots),
        Binding::new("sim/flightmodel/position/groundspeed", F::GroundSpeed, MpsToKnots),
        Binding::new("sim/flightmodel/position/vh_ind_fpm", F::VerticalSpeed, Identity),
        Binding::new("sim/flightmodel/position/phi", F::BankAngle, Identity),
        Binding::new("sim/flightmodel/position/theta", F::PitchAngle, Identity),
        Binding::new("sim/flightmodel/position/beta", F::Sideslip, Identity),
        Binding::new("sim/flightmodel/forces/g_nrml", F::GForce, Identity),
        Binding::new("sim/flightmodel/failures/onground_any", F::OnGround, Bool),
        Binding::new("sim/weather/wind_direction_degt", F::WindDirection, Identity),
        Binding::new("sim/weather/wind_speed_kt", F::WindSpeed, Identity),
        Binding::new("sim/flightmodel/weight/m_fuel_total", F::FuelTotal, KgToLbs),
        Binding::new("sim/flightmodel/weight/m_fuel[0]", F::FuelTank(FuelTank::LeftMain), KgToLbs),
        Binding::new("sim/flightmodel/weight/m_fuel[1]", F::FuelTank(FuelTank::Center), KgToLbs),
        Binding::new("sim/flightmodel/weight/m_fuel[2]", F::FuelTank(FuelTank::RightMain), KgToLbs),
        Binding::new("sim/flightmodel/weight/m_fixed", F::PayloadTotal, KgToLbs),
        Binding::new("sim/flightmodel/weight/m_total", F::GrossWeight, KgToLbs),
        Binding::new("sim/cockpit2/controls/parking_brake_ratio", F::ParkingBrake, Bool),
        Binding::new("sim/cockpit2/controls/gear_handle_down", F::GearDown, Bool),
        Binding::new("sim/cockpit2/controls/flap_ratio", F::FlapsPercent, Scale(100.0)),
        Binding::new("sim/cockpit/electrical/beacon_lights_on", F::Light(Light::Beacon), Bool),
        Binding::new("sim/cockpit/electrical/landing_lights_on", F::Light(Light::Landing), Bool),
        Binding::new("sim/cockpit/electrical/nav_lights_on", F::Light(Light::Nav), Bool),
        Binding::new("sim/cockpit/electrical/strobe_lights_on", F::Light(Light::Strobe), Bool),
        Binding::new("sim/cockpit/electrical/taxi_light_on", F::Light(Light::Taxi), Bool),
        Binding::new("sim/time/paused", F::Paused, Bool),
        Binding::new("sim/time/sim_speed", F::SimRate, Identity),
        Binding::new("sim/flightmodel2/misc/has_crashed", F::Crashed, Bool),
    ];

    for engine in 0..crate::domain::model::MAX_ENGINES {
        bindings.push(Binding::new(
            &format!("sim/flightmodel/engine/ENGN_running[{}]", engine),
            F::EngineRunning(engine),
            Bool,
        ));
    }

    MappingTable::new(bindings)
}
