mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rhtmx_routes::{Config, Method};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rhtmx-routes")]
#[command(version, about = "RHTMX route compiler - build and inspect file-system routes", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "rhtmx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the app directory and write manifest, registry and prerender list
    Build {
        /// App directory (overrides routing.app_dir)
        #[arg(long)]
        app: Option<PathBuf>,

        /// Output directory (overrides build.out_dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Prerender every page
        #[arg(long)]
        prerender_all: bool,
    },

    /// List the routes of a built manifest
    Routes {
        /// Directory holding manifest.json (overrides build.out_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show which entry a request would match
    Match {
        /// Request path, e.g. /users/42
        path: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: Method,

        /// Directory holding manifest.json (overrides build.out_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    tracing::debug!(path = ?cli.config, app_dir = ?config.routing.app_dir, "configuration loaded");

    match cli.command {
        Commands::Build {
            app,
            out,
            prerender_all,
        } => {
            if let Some(app) = app {
                config.routing.app_dir = app;
            }
            if let Some(out) = out {
                config.build.out_dir = out;
            }
            config.build.prerender_all |= prerender_all;
            commands::build::execute(&config).await?;
        }
        Commands::Routes { out } => {
            let out = out.unwrap_or(config.build.out_dir);
            commands::routes::execute(&out)?;
        }
        Commands::Match { path, method, out } => {
            let out = out.unwrap_or(config.build.out_dir);
            commands::match_path::execute(&out, &path, method)?;
        }
    }

    Ok(())
}
