use clap::Parser;
use opensky_agent::adapters::msfs::{pump_json_lines, MsfsSource};
use opensky_agent::app::{apply_loadout, Loadout};
use opensky_agent::config::{Command, FuelArgs, GradeArgs, PayloadArgs};
use opensky_agent::core::fuel::{distribute_fuel, FuelPlan};
use opensky_agent::core::landing::{grade_landing, LandingMetrics};
use opensky_agent::core::loadsheet::LoadSheet;
use opensky_agent::core::payload::PayloadRequest;
use opensky_agent::domain::model::{AircraftType, Simulator};
use opensky_agent::domain::ports::TelemetrySource;
use opensky_agent::utils::error::{AgentError, Result};
use opensky_agent::utils::{logger, validation::Validate};
use opensky_agent::{AgentConfig, CliConfig, LocalStorage, ReplaySource, ReportWriter, TrackingAgent, XPlaneConnection};
use std::fmt::Write;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    };

    // 初始化日誌
    logger::init_logger(&config.logging.format, cli.verbose);

    tracing::info!("Starting opensky-agent CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Track(_) => track(config).await,
        Command::Fuel(args) => fuel(&config, args).await,
        Command::Payload(args) => payload(&config, args).await,
        Command::Grade(args) => {
            grade(args);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn track(config: AgentConfig) -> Result<()> {
    let aircraft = config.load_aircraft()?.map(|a| a.icao);

    let locations = match config.agent.simulator {
        Simulator::Xplane => {
            let source = XPlaneConnection::new(config.xplane_endpoint(), config.xplane_table());
            run_agent(source, &config, aircraft).await?
        }
        Simulator::Replay => {
            let path = config.replay.path.clone().ok_or_else(|| AgentError::MissingConfigError {
                field: "replay.path".to_string(),
            })?;
            let source = ReplaySource::from_path(path, config.replay.speed);
            run_agent(source, &config, aircraft).await?
        }
        Simulator::Msfs => {
            let (frames, source) = MsfsSource::channel(
                config.msfs.channel_capacity,
                config.msfs_table(),
                config.msfs_timeout(),
            );
            tracing::info!("📥 Reading SimVar frames from stdin");
            let bridge = tokio::spawn(pump_json_lines(tokio::io::BufReader::new(tokio::io::stdin()), frames));
            let result = run_agent(source, &config, aircraft).await;
            bridge.abort();
            result?
        }
    };

    println!("✅ Flight tracking completed!");
    for location in locations {
        println!("📁 Output saved to: {}", location);
    }
    Ok(())
}

async fn run_agent<S: TelemetrySource>(source: S, config: &AgentConfig, aircraft: Option<String>) -> Result<Vec<String>> {
    let mut agent = TrackingAgent::from_config(source, config);
    if let Some(aircraft) = aircraft {
        agent = agent.with_aircraft(aircraft);
    }

    let mut status = agent.subscribe();
    let observer = tokio::spawn(async move {
        let mut last_phase = None;
        while status.changed().await.is_ok() {
            let phase = status.borrow_and_update().phase;
            if last_phase != Some(phase) {
                println!("✈️  {}", phase);
                last_phase = Some(phase);
            }
        }
    });

    let log = agent
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("🛑 Ctrl-C received, finishing flight");
        })
        .await?;
    if let Err(e) = observer.await {
        tracing::debug!("Status observer ended abnormally: {}", e);
    }

    for landing in &log.summary.landings {
        println!(
            "🛬 Landing {} at {:.0} fpm, {:.2} g, {} bounces",
            landing.grade.grade, landing.metrics.landing_rate_fpm, landing.metrics.peak_g, landing.metrics.bounces
        );
    }

    let writer = ReportWriter::new(LocalStorage::new(config.output.path.clone()), config.clone());
    writer.write(&log).await
}

fn require_aircraft(config: &AgentConfig) -> Result<AircraftType> {
    config.load_aircraft()?.ok_or_else(|| AgentError::MissingConfigError {
        field: "agent.aircraft".to_string(),
    })
}

/// 寫入 MSFS 時 stdout 只留給 SimVar 寫入請求，其餘輸出改走 stderr
fn emit(config: &AgentConfig, apply: bool, text: &str) {
    if apply && config.agent.simulator == Simulator::Msfs {
        eprint!("{}", text);
    } else {
        print!("{}", text);
    }
}

async fn fuel(config: &AgentConfig, args: FuelArgs) -> Result<()> {
    let aircraft = require_aircraft(config)?;
    let plan = FuelPlan::estimate(&aircraft, args.distance, args.alternate, args.extra)?;
    let distribution = distribute_fuel(plan.block_fuel(), &aircraft.fuel_capacity)?;

    let mut out = String::new();
    let _ = writeln!(out, "⛽ Fuel plan for {} ({:.0} nm)", aircraft.name, args.distance);
    let _ = writeln!(out, "   taxi        {:>8.0} lbs", plan.taxi_lbs);
    let _ = writeln!(out, "   trip        {:>8.0} lbs", plan.trip_lbs);
    let _ = writeln!(out, "   contingency {:>8.0} lbs", plan.contingency_lbs());
    let _ = writeln!(out, "   alternate   {:>8.0} lbs", plan.alternate_lbs);
    let _ = writeln!(out, "   reserve     {:>8.0} lbs", plan.final_reserve_lbs);
    let _ = writeln!(out, "   extra       {:>8.0} lbs", plan.extra_lbs);
    let _ = writeln!(out, "   block       {:>8.0} lbs", plan.block_fuel());
    for (tank, lbs) in distribution.tanks.iter_nonzero() {
        let _ = writeln!(out, "   {:<11} {:>8.0} lbs", tank.as_str(), lbs);
    }
    if distribution.unallocated_lbs > 0.0 {
        let _ = writeln!(out, "⚠️  {:.0} lbs does not fit the tanks", distribution.unallocated_lbs);
    }
    emit(config, args.apply, &out);

    if args.apply {
        apply_loadout(config, Loadout::Fuel(&distribution.tanks), tokio::io::stdout()).await?;
        emit(config, true, &format!("✅ Fuel written to {}\n", config.agent.simulator));
    }
    Ok(())
}

async fn payload(config: &AgentConfig, args: PayloadArgs) -> Result<()> {
    let aircraft = require_aircraft(config)?;
    let request = PayloadRequest {
        crew_lbs: args.crew.unwrap_or(aircraft.crew_weight_lbs),
        passengers_lbs: args.passengers,
        cargo_lbs: args.cargo,
    };
    let sheet = LoadSheet::suggest(&aircraft, args.distance, args.alternate, 0.0, &request)?;

    let mut out = String::new();
    let _ = writeln!(out, "📦 Load sheet for {}", aircraft.name);
    for (station, lbs) in aircraft.payload_stations.iter().zip(&sheet.payload.stations) {
        let _ = writeln!(out, "   {:<20} {:>8.0} / {:.0} lbs", station.name, lbs, station.max_weight_lbs);
    }
    let _ = writeln!(out, "   zero fuel   {:>8.0} lbs", sheet.zero_fuel_weight_lbs);
    let _ = writeln!(out, "   ramp        {:>8.0} lbs", sheet.ramp_weight_lbs);
    let _ = writeln!(out, "   takeoff     {:>8.0} lbs", sheet.takeoff_weight_lbs);
    let _ = writeln!(out, "   landing     {:>8.0} lbs", sheet.landing_weight_lbs);
    if let Some(cg) = sheet.cg_in {
        let _ = writeln!(out, "   CG          {:>8.1} in", cg);
    }
    for warning in &sheet.warnings {
        let _ = writeln!(out, "⚠️  {}", warning);
    }
    emit(config, args.apply, &out);

    if args.apply {
        apply_loadout(config, Loadout::Payload(&sheet.payload.stations), tokio::io::stdout()).await?;
        emit(config, true, &format!("✅ Payload written to {}\n", config.agent.simulator));
    }
    Ok(())
}

fn grade(args: GradeArgs) {
    let metrics = LandingMetrics {
        landing_rate_fpm: args.rate,
        peak_g: args.g_force,
        bounces: args.bounces,
        crosswind_kts: args.crosswind,
        sideslip_deg: args.sideslip,
        bank_deg: args.bank,
    };
    let result = grade_landing(&metrics);

    println!("🛬 Grade {}", result.grade);
    if !result.limiting.is_empty() {
        let limiting: Vec<String> = result.limiting.iter().map(|c| c.to_string()).collect();
        println!("   limited by {}", limiting.join(", "));
    }
    if result.crosswind_leniency {
        println!("   crosswind leniency applied");
    }
}
