use crate::core::landing::{Grade, LandingMonitor, LandingReport};
use crate::domain::model::TimedSnapshot;
use crate::utils::units::great_circle_nm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const TAXI_SPEED_KTS: f64 = 3.0;
const TAKEOFF_ROLL_IAS_KTS: f64 = 40.0;
const CLIMB_COMPLETE_AGL_FT: f64 = 1_500.0;
const APPROACH_AGL_FT: f64 = 2_500.0;
const LEVEL_BAND_FPM: f64 = 500.0;
const ROLLOUT_COMPLETE_KTS: f64 = 30.0;
const PARKED_SPEED_KTS: f64 = 1.0;
/// 單一取樣間移動超過此距離視為瞬移，不計入航程
const MAX_SEGMENT_NM: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    Preflight,
    TaxiOut,
    Takeoff,
    Climb,
    Cruise,
    Descent,
    Approach,
    Landing,
    TaxiIn,
    Arrived,
}

impl FlightPhase {
    pub fn is_airborne(&self) -> bool {
        matches!(
            self,
            FlightPhase::Climb | FlightPhase::Cruise | FlightPhase::Descent | FlightPhase::Approach
        )
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightPhase::Preflight => "preflight",
            FlightPhase::TaxiOut => "taxi_out",
            FlightPhase::Takeoff => "takeoff",
            FlightPhase::Climb => "climb",
            FlightPhase::Cruise => "cruise",
            FlightPhase::Descent => "descent",
            FlightPhase::Approach => "approach",
            FlightPhase::Landing => "landing",
            FlightPhase::TaxiIn => "taxi_in",
            FlightPhase::Arrived => "arrived",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEventKind {
    PhaseChanged { from: FlightPhase, to: FlightPhase },
    Takeoff,
    Touchdown { grade: Grade, touch_and_go: bool },
    Arrived,
    Crashed,
    Paused,
    Resumed,
    TimeAcceleration { rate: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub at: DateTime<Utc>,
    pub kind: TrackingEventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub off_block_at: Option<DateTime<Utc>>,
    pub takeoff_at: Option<DateTime<Utc>>,
    pub landing_at: Option<DateTime<Utc>>,
    pub on_block_at: Option<DateTime<Utc>>,
    pub last_sample_at: Option<DateTime<Utc>>,
    pub block_minutes: Option<f64>,
    pub air_minutes: Option<f64>,
    pub distance_nm: f64,
    pub fuel_start_lbs: f64,
    pub fuel_end_lbs: f64,
    pub fuel_used_lbs: f64,
    pub max_altitude_ft: f64,
    pub final_phase: FlightPhase,
    pub landings: Vec<LandingReport>,
    pub crashed: bool,
    pub used_time_acceleration: bool,
    pub samples: usize,
}

/// 由高度與垂直速度推斷空中階段
fn airborne_phase(altitude_agl_ft: f64, vertical_speed_fpm: f64) -> FlightPhase {
    if vertical_speed_fpm > LEVEL_BAND_FPM {
        FlightPhase::Climb
    } else if altitude_agl_ft < APPROACH_AGL_FT {
        FlightPhase::Approach
    } else if vertical_speed_fpm < -LEVEL_BAND_FPM {
        FlightPhase::Descent
    } else {
        FlightPhase::Cruise
    }
}

fn minutes_between(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<f64> {
    match (from, to) {
        (Some(from), Some(to)) if to >= from => Some((to - from).num_seconds() as f64 / 60.0),
        _ => None,
    }
}

/// 追蹤飛行階段、距離與油耗
#[derive(Debug)]
pub struct FlightTracker {
    phase: FlightPhase,
    monitor: LandingMonitor,
    landings: Vec<LandingReport>,
    events: Vec<TrackingEvent>,

    started_at: Option<DateTime<Utc>>,
    off_block_at: Option<DateTime<Utc>>,
    takeoff_at: Option<DateTime<Utc>>,
    landing_at: Option<DateTime<Utc>>,
    on_block_at: Option<DateTime<Utc>>,
    last_sample_at: Option<DateTime<Utc>>,

    last_position: Option<(f64, f64)>,
    was_on_ground: Option<bool>,
    distance_nm: f64,
    fuel_start_lbs: Option<f64>,
    fuel_end_lbs: f64,
    max_altitude_ft: f64,

    paused: bool,
    accelerated: bool,
    used_time_acceleration: bool,
    crashed: bool,
    samples: usize,
}

impl Default for FlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightTracker {
    pub fn new() -> Self {
        Self {
            phase: FlightPhase::Preflight,
            monitor: LandingMonitor::new(),
            landings: Vec::new(),
            events: Vec::new(),
            started_at: None,
            off_block_at: None,
            takeoff_at: None,
            landing_at: None,
            on_block_at: None,
            last_sample_at: None,
            last_position: None,
            was_on_ground: None,
            distance_nm: 0.0,
            fuel_start_lbs: None,
            fuel_end_lbs: 0.0,
            max_altitude_ft: 0.0,
            paused: false,
            accelerated: false,
            used_time_acceleration: false,
            crashed: false,
            samples: 0,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    pub fn landings(&self) -> &[LandingReport] {
        &self.landings
    }

    pub fn has_arrived(&self) -> bool {
        self.phase == FlightPhase::Arrived
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// 處理一筆遙測，回傳這筆資料產生的事件
    pub fn update(&mut self, sample: &TimedSnapshot) -> Vec<TrackingEvent> {
        let first_event = self.events.len();
        let snapshot = &sample.snapshot;

        self.samples += 1;
        self.started_at.get_or_insert(sample.at);
        self.last_sample_at = Some(sample.at);

        if snapshot.paused != self.paused {
            self.paused = snapshot.paused;
            let kind = if snapshot.paused {
                TrackingEventKind::Paused
            } else {
                TrackingEventKind::Resumed
            };
            self.push_event(sample, kind);
        }
        if self.paused {
            return self.events[first_event..].to_vec();
        }

        let accelerated = snapshot.sim_rate > 1.0 + f64::EPSILON;
        if accelerated && !self.accelerated {
            self.used_time_acceleration = true;
            tracing::warn!("⏩ Time acceleration x{}", snapshot.sim_rate);
            self.push_event(sample, TrackingEventKind::TimeAcceleration { rate: snapshot.sim_rate });
        }
        self.accelerated = accelerated;

        if snapshot.crashed && !self.crashed {
            self.crashed = true;
            tracing::error!("💥 Aircraft crashed");
            self.push_event(sample, TrackingEventKind::Crashed);
        }

        self.track_position(sample);
        self.fuel_start_lbs.get_or_insert(snapshot.fuel_total_lbs);
        self.fuel_end_lbs = snapshot.fuel_total_lbs;
        self.max_altitude_ft = self.max_altitude_ft.max(snapshot.altitude_ft);

        let was_on_ground = self.was_on_ground.replace(snapshot.on_ground);
        if was_on_ground == Some(true) && !snapshot.on_ground {
            self.on_liftoff(sample);
        } else if was_on_ground == Some(false) && snapshot.on_ground {
            self.on_touchdown(sample);
        }

        if let Some(report) = self.monitor.update(sample) {
            self.on_landing_report(sample, report);
        }

        self.advance_phase(sample);

        self.events[first_event..].to_vec()
    }

    /// 資料流結束時結算未完成的落地並產生摘要
    pub fn finish(&mut self) -> FlightSummary {
        if let Some(report) = self.monitor.finish() {
            self.landings.push(report);
        }
        self.summary()
    }

    pub fn summary(&self) -> FlightSummary {
        let fuel_start = self.fuel_start_lbs.unwrap_or(self.fuel_end_lbs);
        let block_end = self.on_block_at.or(self.last_sample_at);
        let air_end = self.landing_at.filter(|at| Some(*at) >= self.takeoff_at);

        FlightSummary {
            started_at: self.started_at,
            off_block_at: self.off_block_at,
            takeoff_at: self.takeoff_at,
            landing_at: self.landing_at,
            on_block_at: self.on_block_at,
            last_sample_at: self.last_sample_at,
            block_minutes: minutes_between(self.off_block_at, block_end),
            air_minutes: minutes_between(self.takeoff_at, air_end),
            distance_nm: self.distance_nm,
            fuel_start_lbs: fuel_start,
            fuel_end_lbs: self.fuel_end_lbs,
            fuel_used_lbs: (fuel_start - self.fuel_end_lbs).max(0.0),
            max_altitude_ft: self.max_altitude_ft,
            final_phase: self.phase,
            landings: self.landings.clone(),
            crashed: self.crashed,
            used_time_acceleration: self.used_time_acceleration,
            samples: self.samples,
        }
    }

    fn track_position(&mut self, sample: &TimedSnapshot) {
        let position = (sample.snapshot.latitude, sample.snapshot.longitude);
        if let Some((lat, lon)) = self.last_position {
            let segment = great_circle_nm(lat, lon, position.0, position.1);
            if segment > MAX_SEGMENT_NM {
                tracing::warn!("📍 Ignoring {:.1} nm position jump", segment);
            } else if !matches!(self.phase, FlightPhase::Preflight | FlightPhase::Arrived) {
                self.distance_nm += segment;
            }
        }
        self.last_position = Some(position);
    }

    fn on_liftoff(&mut self, sample: &TimedSnapshot) {
        if matches!(
            self.phase,
            FlightPhase::Preflight | FlightPhase::TaxiOut | FlightPhase::Takeoff
        ) {
            if self.takeoff_at.is_none() {
                self.takeoff_at = Some(sample.at);
            }
            self.off_block_at.get_or_insert(sample.at);
            tracing::info!("🛫 Takeoff");
            self.push_event(sample, TrackingEventKind::Takeoff);
            self.set_phase(sample, FlightPhase::Climb);
        }
    }

    fn on_touchdown(&mut self, sample: &TimedSnapshot) {
        if self.phase.is_airborne() || self.phase == FlightPhase::Takeoff {
            self.landing_at = Some(sample.at);
            self.set_phase(sample, FlightPhase::Landing);
        }
    }

    fn on_landing_report(&mut self, sample: &TimedSnapshot, report: LandingReport) {
        self.push_event(
            sample,
            TrackingEventKind::Touchdown {
                grade: report.grade.grade,
                touch_and_go: report.touch_and_go,
            },
        );
        if report.touch_and_go && !sample.snapshot.on_ground {
            self.set_phase(sample, FlightPhase::Climb);
        }
        self.landings.push(report);
    }

    fn advance_phase(&mut self, sample: &TimedSnapshot) {
        let s = &sample.snapshot;
        let next = match self.phase {
            FlightPhase::Preflight if s.on_ground && s.ground_speed_kts > TAXI_SPEED_KTS => {
                self.off_block_at.get_or_insert(sample.at);
                Some(FlightPhase::TaxiOut)
            }
            // 追蹤開始時已在空中 (中途連線或重新啟動)
            FlightPhase::Preflight if !s.on_ground => {
                let phase = airborne_phase(s.altitude_agl_ft, s.vertical_speed_fpm);
                tracing::info!("✈️ Joined flight in progress ({})", phase);
                Some(phase)
            }
            FlightPhase::TaxiOut if s.on_ground && s.indicated_airspeed_kts > TAKEOFF_ROLL_IAS_KTS => {
                Some(FlightPhase::Takeoff)
            }
            FlightPhase::Takeoff if s.on_ground && s.ground_speed_kts < ROLLOUT_COMPLETE_KTS => {
                Some(FlightPhase::TaxiOut)
            }
            FlightPhase::Climb if s.altitude_agl_ft > CLIMB_COMPLETE_AGL_FT && s.vertical_speed_fpm.abs() < LEVEL_BAND_FPM => {
                Some(FlightPhase::Cruise)
            }
            FlightPhase::Climb | FlightPhase::Cruise if s.vertical_speed_fpm < -LEVEL_BAND_FPM => {
                Some(FlightPhase::Descent)
            }
            FlightPhase::Cruise | FlightPhase::Descent if s.vertical_speed_fpm > LEVEL_BAND_FPM => {
                Some(FlightPhase::Climb)
            }
            FlightPhase::Descent if s.altitude_agl_ft < APPROACH_AGL_FT => Some(FlightPhase::Approach),
            FlightPhase::Approach if s.vertical_speed_fpm > LEVEL_BAND_FPM && s.altitude_agl_ft > APPROACH_AGL_FT => {
                Some(FlightPhase::Climb)
            }
            FlightPhase::Landing if s.on_ground && s.ground_speed_kts < ROLLOUT_COMPLETE_KTS => {
                Some(FlightPhase::TaxiIn)
            }
            FlightPhase::TaxiIn
                if s.on_ground
                    && s.ground_speed_kts < PARKED_SPEED_KTS
                    && s.parking_brake
                    && !s.any_engine_running() =>
            {
                Some(FlightPhase::Arrived)
            }
            _ => None,
        };

        if let Some(phase) = next {
            self.set_phase(sample, phase);
            if phase == FlightPhase::Arrived {
                self.on_block_at = Some(sample.at);
                tracing::info!("🅿️ Arrived, {:.1} nm flown", self.distance_nm);
                self.push_event(sample, TrackingEventKind::Arrived);
            }
        }
    }

    fn set_phase(&mut self, sample: &TimedSnapshot, phase: FlightPhase) {
        if phase == self.phase {
            return;
        }
        let from = self.phase;
        self.phase = phase;
        tracing::debug!("🔀 Phase {} → {}", from, phase);
        self.push_event(sample, TrackingEventKind::PhaseChanged { from, to: phase });
    }

    fn push_event(&mut self, sample: &TimedSnapshot, kind: TrackingEventKind) {
        self.events.push(TrackingEvent {
            at: sample.at,
            kind,
            latitude: sample.snapshot.latitude,
            longitude: sample.snapshot.longitude,
            altitude_ft: sample.snapshot.altitude_ft,
        });
    }
}
