pub mod cli;
pub mod toml_config;

pub use toml_config::AgentConfig;

#[cfg(feature = "cli")]
use crate::domain::model::Simulator;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "opensky-agent")]
#[command(about = "Flight tracking agent for X-Plane 11 and MSFS")]
pub struct CliConfig {
    #[arg(long, short, global = true, help = "TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 連線模擬器並追蹤飛行
    Track(TrackArgs),
    /// 計算燃油計畫與油箱分配
    Fuel(FuelArgs),
    /// 分配酬載並產生裝載表
    Payload(PayloadArgs),
    /// 以落地數據評分
    Grade(GradeArgs),
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct TrackArgs {
    #[arg(long, help = "xplane, msfs or replay")]
    pub simulator: Option<Simulator>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long, help = "Recorded telemetry.csv to replay")]
    pub replay: Option<String>,

    #[arg(long, help = "Replay speed multiplier")]
    pub speed: Option<f64>,

    #[arg(long)]
    pub aircraft: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long, help = "Pack the flight log into a ZIP archive")]
    pub compress: bool,

    #[arg(long, help = "Keep tracking after arrival")]
    pub keep_running: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct FuelArgs {
    #[arg(long, help = "Aircraft TOML file")]
    pub aircraft: Option<String>,

    #[arg(long, help = "Route distance in nm")]
    pub distance: f64,

    #[arg(long, default_value = "0")]
    pub alternate: f64,

    #[arg(long, default_value = "0", help = "Extra fuel in lbs")]
    pub extra: f64,

    #[arg(long, help = "Write the distribution to X-Plane")]
    pub apply: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct PayloadArgs {
    #[arg(long, help = "Aircraft TOML file")]
    pub aircraft: Option<String>,

    #[arg(long, default_value = "0", help = "Passenger weight in lbs")]
    pub passengers: f64,

    #[arg(long, default_value = "0", help = "Cargo weight in lbs")]
    pub cargo: f64,

    #[arg(long, help = "Crew weight in lbs, defaults to the aircraft file")]
    pub crew: Option<f64>,

    #[arg(long, default_value = "0", help = "Route distance in nm for the fuel plan")]
    pub distance: f64,

    #[arg(long, default_value = "0")]
    pub alternate: f64,

    #[arg(long, help = "Write the distribution to X-Plane")]
    pub apply: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct GradeArgs {
    #[arg(long, allow_negative_numbers = true, help = "Landing rate in fpm")]
    pub rate: f64,

    #[arg(long, default_value = "1.0")]
    pub g_force: f64,

    #[arg(long, default_value = "0")]
    pub bounces: u32,

    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub crosswind: f64,

    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub sideslip: f64,

    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub bank: f64,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 讀取設定檔 (若有指定) 並套用命令列覆寫
    pub fn load_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_file(path)?,
            None => AgentConfig::default(),
        };

        match &self.command {
            Command::Track(args) => args.apply_to(&mut config),
            Command::Fuel(args) => {
                if args.aircraft.is_some() {
                    config.agent.aircraft = args.aircraft.clone();
                }
            }
            Command::Payload(args) => {
                if args.aircraft.is_some() {
                    config.agent.aircraft = args.aircraft.clone();
                }
            }
            Command::Grade(_) => {}
        }

        Ok(config)
    }
}

#[cfg(feature = "cli")]
impl TrackArgs {
    pub fn apply_to(&self, config: &mut AgentConfig) {
        if let Some(simulator) = self.simulator {
            config.agent.simulator = simulator;
        }
        if let Some(path) = &self.replay {
            config.replay.path = Some(path.clone());
            if self.simulator.is_none() {
                config.agent.simulator = Simulator::Replay;
            }
        }
        if self.speed.is_some() {
            config.replay.speed = self.speed;
        }
        if let Some(host) = &self.host {
            config.xplane.host = host.clone();
        }
        if let Some(port) = self.port {
            config.xplane.port = port;
        }
        if self.aircraft.is_some() {
            config.agent.aircraft = self.aircraft.clone();
        }
        if let Some(path) = &self.output_path {
            config.output.path = path.clone();
        }
        if self.compress {
            config.output.compression = true;
        }
        if self.keep_running {
            config.agent.stop_on_arrival = false;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_track_overrides() {
        let cli = CliConfig::parse_from([
            "opensky-agent",
            "track",
            "--replay",
            "flights/a/telemetry.csv",
            "--speed",
            "4",
            "--compress",
        ]);
        let config = cli.load_config().unwrap();

        assert_eq!(config.agent.simulator, Simulator::Replay);
        assert_eq!(config.replay.path.as_deref(), Some("flights/a/telemetry.csv"));
        assert_eq!(config.replay.speed, Some(4.0));
        assert!(config.output.compression);
    }

    #[test]
    fn test_grade_accepts_negative_rate() {
        let cli = CliConfig::parse_from(["opensky-agent", "grade", "--rate", "-320", "--g-force", "1.4"]);
        match cli.command {
            Command::Grade(args) => {
                assert_eq!(args.rate, -320.0);
                assert_eq!(args.g_force, 1.4);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_simulator_is_rejected() {
        let result = CliConfig::try_parse_from(["opensky-agent", "track", "--simulator", "fsx"]);
        assert!(result.is_err());
    }
}
