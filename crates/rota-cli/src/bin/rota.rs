use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rota_cli::{load_points_file, typed_points, Config};
use rota_core::{plan_route, Overview, PointRecord, Profile, RouteOptions, KMZ_MIME_TYPE};
use rota_osrm::OsrmClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Used when RUST_LOG is unset. Library events come from their own crates.
const DEFAULT_LOG_FILTER: &str = "rota=info,rota_cli=info,rota_core=info,rota_osrm=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "Road-following routes through named points, exported as KMZ", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a points file and print the records as JSON
    Points {
        /// .csv, .xlsx, .kml or .kmz file
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Route through the points and write a KMZ
    Route(RouteArgs),
}

#[derive(Args, Debug)]
struct RouteArgs {
    /// .csv, .xlsx, .kml or .kmz file; file order is the visiting order
    #[arg(long, short, conflicts_with_all = ["from", "to"])]
    input: Option<PathBuf>,

    /// First coordinate as "lat, lon"
    #[arg(long, requires = "to", allow_hyphen_values = true)]
    from: Option<String>,

    /// Second coordinate as "lat, lon"
    #[arg(long, requires = "from", allow_hyphen_values = true)]
    to: Option<String>,

    /// driving, cycling or foot (default from ROTA_PROFILE)
    #[arg(long)]
    profile: Option<Profile>,

    /// full, simplified or false
    #[arg(long, default_value_t = Overview::Full)]
    overview: Overview,

    /// OSRM base URL (default from ROTA_OSRM_URL)
    #[arg(long)]
    osrm_url: Option<String>,

    /// Request timeout in seconds (default from ROTA_TIMEOUT_S)
    #[arg(long)]
    timeout_s: Option<u64>,

    #[arg(long, default_value = rota_core::pipeline::DEFAULT_ROUTE_NAME)]
    route_name: String,

    /// Where to write the KMZ
    #[arg(long, short, default_value = "rota_osrm.kmz")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Points { input } => {
            let points = load_points_file(&input)?;
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Command::Route(args) => run_route(args, Config::from_env())?,
    }
    Ok(())
}

fn collect_points(args: &RouteArgs) -> Result<Vec<PointRecord>> {
    match (&args.input, &args.from, &args.to) {
        (Some(path), _, _) => load_points_file(path),
        (None, Some(from), Some(to)) => typed_points(from, to),
        _ => bail!("Provide --input FILE or both --from and --to"),
    }
}

fn run_route(args: RouteArgs, config: Config) -> Result<()> {
    let points = collect_points(&args)?;
    if points.len() < 2 {
        bail!("At least 2 points are required, got {}", points.len());
    }

    let osrm_url = args.osrm_url.clone().unwrap_or(config.osrm_url);
    let timeout = Duration::from_secs(args.timeout_s.unwrap_or(config.timeout_s));
    let client = OsrmClient::with_timeout(osrm_url, timeout)?;
    tracing::info!(osrm = client.base_url(), "using routing service");

    let options = RouteOptions {
        profile: args.profile.unwrap_or(config.profile),
        overview: args.overview,
        route_name: args.route_name.clone(),
    };

    let plan = plan_route(&client, &points, &options).context("Failed to get route")?;

    std::fs::write(&args.output, &plan.kmz)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Distance: {:.2} km | Duration: {:.1} min | Points: {}",
        plan.summary.distance_km, plan.summary.duration_min, plan.summary.waypoints
    );
    println!(
        "Origin: {} ({}, {}) -> Destination: {} ({}, {})",
        plan.origin.name,
        plan.origin.latitude,
        plan.origin.longitude,
        plan.destination.name,
        plan.destination.latitude,
        plan.destination.longitude
    );
    println!(
        "Wrote {} ({} bytes, {})",
        args.output.display(),
        plan.kmz.len(),
        KMZ_MIME_TYPE
    );
    Ok(())
}
