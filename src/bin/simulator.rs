use clap::{App, Arg, ArgMatches};
use colored::*;
use debrissat::config::SimConfig;
use debrissat::listener::SatListener;
use debrissat::session::SessionEnd;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("debrissat-sim")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("🛰️  Debris tracking satellite simulator - synthetic debris field over TCP")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Listen address")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Listen port")
                .takes_value(true)
                .validator(|v| match v.parse::<u16>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Port must be a number between 0 and 65535".into()),
                }),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .value_name("SEED")
                .help("Random seed for the debris field")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Seed must be a valid number".into()),
                }),
        )
        .arg(
            Arg::with_name("period")
                .long("period-ms")
                .value_name("MILLIS")
                .help("Broadcast period in milliseconds")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Period must be a valid number".into()),
                }),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable debug logging"),
        )
        .get_matches();

    let default_level = if matches.is_present("verbose") { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = build_config(&matches)?;
    print_banner(&config);

    let listener = SatListener::bind(config).await?;
    info!("⏳ Waiting for operator station on {}", listener.local_addr()?);

    let report = listener.serve_one().await?;
    match &report.end {
        SessionEnd::Closed => println!("{}", "✅ Session closed by client".green()),
        SessionEnd::Failed(reason) => {
            error!("Session ended with transport failure: {}", reason);
            println!("{} {}", "⚠️  Session failed:".yellow(), reason);
        }
    }
    println!(
        "   Messages received: {}  Images sent: {}  Frames broadcast: {}",
        report.messages_received, report.images_sent, report.broadcast.frames_sent
    );
    println!("🛑 Debris satellite simulator stopped");

    Ok(())
}

fn build_config(matches: &ArgMatches) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if let Some(host) = matches.value_of("host") {
        config.host = host.to_string();
    }
    if let Some(port) = matches.value_of("port") {
        config.port = port.parse()?;
    }
    if let Some(seed) = matches.value_of("seed") {
        config.seed = seed.parse()?;
    }
    if let Some(period) = matches.value_of("period") {
        config.broadcast_period_ms = period.parse()?;
    }

    config.validate()?;
    Ok(config)
}

fn print_banner(config: &SimConfig) {
    println!("{}", "🛰️  Debris Tracking Satellite Simulator".bold().cyan());
    println!("{}", "======================================".cyan());
    println!("   Seed: {}", config.seed.to_string().bold());
    println!(
        "   View region: {}x{}  Chunk: {}x{}",
        config.view_width, config.view_height, config.chunk_width, config.chunk_height
    );
    println!(
        "   Max entities: {}  Spawn chance: {}  Max speed: {}",
        config.max_entities, config.spawn_probability, config.max_speed
    );
    println!("   Broadcast period: {} ms", config.broadcast_period_ms);
    println!("📡 Single-client endpoint on {}", config.listen_addr().bold());
}
