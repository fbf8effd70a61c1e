use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use stride_quest::Config;

#[derive(Parser)]
#[command(name = "stride-quest-server")]
#[command(about = "HTTP service for location-based trail experiences")]
struct Args {
    /// Port to run the HTTP server on
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    port: u16,

    /// JSON config file; built-in defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding sample_trails.json, gpx/ and references/
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    let config = match &args.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };

    info!(
        "Starting StrideQuest with trails from {}",
        config.store.trails_path.display()
    );

    match stride_quest::http::serve(config, args.port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server exited: {}", e);
            ExitCode::FAILURE
        }
    }
}
