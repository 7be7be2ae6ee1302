use anyhow::Context;
use clap::Parser;
use opensky_agent::app::report::extract_telemetry;
use opensky_agent::utils::logger;
use opensky_agent::{AgentConfig, LocalStorage, ReplaySource, ReportWriter, TrackingAgent};
use std::path::Path;

#[derive(Parser)]
#[command(name = "replay-flight")]
#[command(about = "Replay a recorded flight log and grade it again")]
struct Args {
    /// telemetry.csv or a ZIP flight log
    input: String,

    /// Replay speed multiplier, omit to replay instantly
    #[arg(long)]
    speed: Option<f64>,

    /// Write a new flight log to this directory
    #[arg(long)]
    output: Option<String>,

    /// Print the flight summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);
    tracing::info!("📼 Replaying {}", args.input);

    let data = std::fs::read(&args.input).with_context(|| format!("failed to read {}", args.input))?;
    let is_zip = Path::new(&args.input)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let csv = if is_zip {
        extract_telemetry(&data).context("ZIP flight log has no telemetry.csv")?
    } else {
        data
    };

    let source = ReplaySource::from_reader(csv.as_slice(), args.speed).context("malformed telemetry CSV")?;
    let log = TrackingAgent::new(source, false, 1).run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&log.summary)?);
    } else {
        let summary = &log.summary;
        println!("✅ Replayed {} samples", summary.samples);
        println!("   distance   {:.1} nm", summary.distance_nm);
        println!("   fuel used  {:.0} lbs", summary.fuel_used_lbs);
        println!("   max alt    {:.0} ft", summary.max_altitude_ft);
        if let Some(minutes) = summary.block_minutes {
            println!("   block time {:.0} min", minutes);
        }
        for landing in &summary.landings {
            println!(
                "🛬 Landing {} at {:.0} fpm, {:.2} g, {} bounces",
                landing.grade.grade, landing.metrics.landing_rate_fpm, landing.metrics.peak_g, landing.metrics.bounces
            );
        }
    }

    if let Some(output) = args.output {
        let mut config = AgentConfig::default();
        config.output.path = output.clone();
        let writer = ReportWriter::new(LocalStorage::new(output), config);
        for location in writer.write(&log).await? {
            println!("📁 Output saved to: {}", location);
        }
    }

    Ok(())
}
