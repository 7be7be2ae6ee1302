use crate::domain::model::{TelemetrySnapshot, TimedSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 側風超過此值 (kts) 時評分放寬一級
pub const CROSSWIND_LENIENCY_KTS: f64 = 20.0;

const RATE_LIMITS_FPM: [f64; 4] = [180.0, 300.0, 450.0, 600.0];
const G_FORCE_LIMITS: [f64; 4] = [1.30, 1.50, 1.80, 2.10];
const BOUNCE_LIMITS: [f64; 4] = [0.0, 1.0, 2.0, 3.0];
const BANK_LIMITS_DEG: [f64; 4] = [3.0, 5.0, 8.0, 12.0];
const SIDESLIP_LIMITS_DEG: [f64; 4] = [3.0, 6.0, 10.0, 15.0];

/// 接地後地速低於此值視為落地完成
const ROLLOUT_COMPLETE_KTS: f64 = 30.0;
/// 每次接地後量測 g 值的時間窗
const G_WINDOW_MS: i64 = 2_000;
const GROUND_TIMEOUT_MS: i64 = 20_000;
/// 離地超過此時間視為 touch-and-go
const TOUCH_AND_GO_MS: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    const BY_RANK: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// 放寬一級；F 不受影響
    pub fn lenient(self) -> Self {
        match self {
            Grade::A | Grade::B => Grade::A,
            Grade::C => Grade::B,
            Grade::D => Grade::C,
            Grade::F => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingCriterion {
    LandingRate,
    GForce,
    Bounces,
    Bank,
    Sideslip,
}

impl fmt::Display for LandingCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LandingCriterion::LandingRate => "landing rate",
            LandingCriterion::GForce => "g-force",
            LandingCriterion::Bounces => "bounces",
            LandingCriterion::Bank => "bank angle",
            LandingCriterion::Sideslip => "sideslip",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandingMetrics {
    /// 接地垂直速度 (fpm)，下降為負
    pub landing_rate_fpm: f64,
    pub peak_g: f64,
    pub bounces: u32,
    pub crosswind_kts: f64,
    pub sideslip_deg: f64,
    pub bank_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingGrade {
    pub grade: Grade,
    /// 決定最終等級的項目
    pub limiting: Vec<LandingCriterion>,
    pub crosswind_leniency: bool,
}

fn grade_against(value: f64, limits: &[f64; 4]) -> Grade {
    limits
        .iter()
        .position(|limit| value <= *limit)
        .map(|rank| Grade::BY_RANK[rank])
        .unwrap_or(Grade::F)
}

/// 依門檻表評分，取最差項目
pub fn grade_landing(metrics: &LandingMetrics) -> LandingGrade {
    let criteria = [
        (
            LandingCriterion::LandingRate,
            grade_against(metrics.landing_rate_fpm.abs(), &RATE_LIMITS_FPM),
        ),
        (LandingCriterion::GForce, grade_against(metrics.peak_g, &G_FORCE_LIMITS)),
        (
            LandingCriterion::Bounces,
            grade_against(metrics.bounces as f64, &BOUNCE_LIMITS),
        ),
        (LandingCriterion::Bank, grade_against(metrics.bank_deg.abs(), &BANK_LIMITS_DEG)),
        (
            LandingCriterion::Sideslip,
            grade_against(metrics.sideslip_deg.abs(), &SIDESLIP_LIMITS_DEG),
        ),
    ];

    let worst = criteria.iter().map(|(_, grade)| *grade).max().unwrap_or(Grade::A);
    let limiting = if worst == Grade::A {
        Vec::new()
    } else {
        criteria
            .iter()
            .filter(|(_, grade)| *grade == worst)
            .map(|(criterion, _)| *criterion)
            .collect()
    };

    let crosswind_leniency = metrics.crosswind_kts.abs() >= CROSSWIND_LENIENCY_KTS && worst != Grade::F && worst != Grade::A;
    let grade = if crosswind_leniency { worst.lenient() } else { worst };

    LandingGrade {
        grade,
        limiting,
        crosswind_leniency,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingReport {
    pub touchdown_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub heading_true: f64,
    pub touchdown_speed_kts: f64,
    pub metrics: LandingMetrics,
    pub grade: LandingGrade,
    pub touch_and_go: bool,
}

#[derive(Debug, Clone)]
struct Touchdown {
    at: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    heading_true: f64,
    speed_kts: f64,
    metrics: LandingMetrics,
    last_contact: DateTime<Utc>,
    lifted_off: Option<DateTime<Utc>>,
}

impl Touchdown {
    fn finish(self, touch_and_go: bool) -> LandingReport {
        let grade = grade_landing(&self.metrics);
        tracing::info!(
            "🛬 Landing graded {} ({:.0} fpm, {:.2} g, {} bounces)",
            grade.grade,
            self.metrics.landing_rate_fpm,
            self.metrics.peak_g,
            self.metrics.bounces
        );
        LandingReport {
            touchdown_at: self.at,
            latitude: self.latitude,
            longitude: self.longitude,
            heading_true: self.heading_true,
            touchdown_speed_kts: self.speed_kts,
            metrics: self.metrics,
            grade,
            touch_and_go,
        }
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds()
}

fn worse_abs(a: f64, b: f64) -> f64 {
    if a.abs() >= b.abs() {
        a
    } else {
        b
    }
}

/// 由遙測序列偵測接地並產生落地報告
#[derive(Debug, Default)]
pub struct LandingMonitor {
    previous: Option<TelemetrySnapshot>,
    touchdown: Option<Touchdown>,
}

impl LandingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_progress(&self) -> bool {
        self.touchdown.is_some()
    }

    pub fn update(&mut self, sample: &TimedSnapshot) -> Option<LandingReport> {
        let current = &sample.snapshot;
        let was_airborne = self.previous.as_ref().map(|p| !p.on_ground).unwrap_or(false);

        let report = match self.touchdown.take() {
            None => {
                if was_airborne && current.on_ground {
                    self.touchdown = self.previous.as_ref().map(|last_air| Self::begin(sample, last_air));
                }
                None
            }
            Some(mut touchdown) => {
                if current.on_ground {
                    if touchdown.lifted_off.take().is_some() {
                        touchdown.metrics.bounces += 1;
                        touchdown.last_contact = sample.at;
                        tracing::debug!("🏀 Bounce #{}", touchdown.metrics.bounces);
                    }
                    if millis_between(touchdown.last_contact, sample.at) <= G_WINDOW_MS {
                        touchdown.metrics.peak_g = touchdown.metrics.peak_g.max(current.g_force);
                    }

                    if current.ground_speed_kts < ROLLOUT_COMPLETE_KTS
                        || millis_between(touchdown.last_contact, sample.at) >= GROUND_TIMEOUT_MS
                    {
                        Some(touchdown.finish(false))
                    } else {
                        self.touchdown = Some(touchdown);
                        None
                    }
                } else {
                    let lifted_off = *touchdown.lifted_off.get_or_insert(sample.at);
                    if millis_between(lifted_off, sample.at) >= TOUCH_AND_GO_MS {
                        Some(touchdown.finish(true))
                    } else {
                        self.touchdown = Some(touchdown);
                        None
                    }
                }
            }
        };

        self.previous = Some(current.clone());
        report
    }

    /// 資料流結束時，結算尚未完成的落地
    pub fn finish(&mut self) -> Option<LandingReport> {
        self.touchdown.take().map(|touchdown| {
            let touch_and_go = touchdown.lifted_off.is_some();
            touchdown.finish(touch_and_go)
        })
    }

    fn begin(sample: &TimedSnapshot, last_air: &TelemetrySnapshot) -> Touchdown {
        let current = &sample.snapshot;
        let metrics = LandingMetrics {
            landing_rate_fpm: last_air.vertical_speed_fpm.min(current.vertical_speed_fpm),
            peak_g: current.g_force.max(last_air.g_force),
            bounces: 0,
            crosswind_kts: current.crosswind_kts().abs(),
            sideslip_deg: worse_abs(last_air.sideslip_deg, current.sideslip_deg),
            bank_deg: worse_abs(last_air.bank_angle_deg, current.bank_angle_deg),
        };
        tracing::info!(
            "🛬 Touchdown at {:.0} fpm, {:.2} g",
            metrics.landing_rate_fpm,
            metrics.peak_g
        );

        Touchdown {
            at: sample.at,
            latitude: current.latitude,
            longitude: current.longitude,
            heading_true: current.heading_true,
            speed_kts: current.ground_speed_kts,
            metrics,
            last_contact: sample.at,
            lifted_off: None,
        }
    }
}
