//! 單位換算。所有函數皆為純函數，且可互相反轉。

pub const FEET_PER_METER: f64 = 3.280_839_895;
pub const KNOTS_PER_MPS: f64 = 1.943_844_492;
pub const FPM_PER_MPS: f64 = 196.850_393_7;
pub const LBS_PER_KG: f64 = 2.204_622_621_85;

/// 平均地球半徑 (海里)
pub const EARTH_RADIUS_NM: f64 = 3440.065;

pub fn meters_to_feet(m: f64) -> f64 {
    m * FEET_PER_METER
}

pub fn feet_to_meters(ft: f64) -> f64 {
    ft / FEET_PER_METER
}

pub fn mps_to_knots(mps: f64) -> f64 {
    mps * KNOTS_PER_MPS
}

pub fn knots_to_mps(kts: f64) -> f64 {
    kts / KNOTS_PER_MPS
}

pub fn mps_to_fpm(mps: f64) -> f64 {
    mps * FPM_PER_MPS
}

pub fn fpm_to_mps(fpm: f64) -> f64 {
    fpm / FPM_PER_MPS
}

pub fn fps_to_fpm(fps: f64) -> f64 {
    fps * 60.0
}

pub fn fpm_to_fps(fpm: f64) -> f64 {
    fpm / 60.0
}

pub fn kg_to_lbs(kg: f64) -> f64 {
    kg * LBS_PER_KG
}

pub fn lbs_to_kg(lbs: f64) -> f64 {
    lbs / LBS_PER_KG
}

pub fn gallons_to_lbs(gallons: f64, lbs_per_gallon: f64) -> f64 {
    gallons * lbs_per_gallon
}

/// 每加侖重量為零時回傳 0，避免除以零
pub fn lbs_to_gallons(lbs: f64, lbs_per_gallon: f64) -> f64 {
    if lbs_per_gallon <= 0.0 {
        0.0
    } else {
        lbs / lbs_per_gallon
    }
}

/// 兩點間大圓距離 (海里)
pub fn great_circle_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}
