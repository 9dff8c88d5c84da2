//! Point d'entrée CLI pour catasto-tiles

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Variables CATASTO_* depuis un `.env` : répertoire courant, puis celui du binaire
fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")));
    if let Some(path) = beside_exe {
        let _ = dotenvy::from_path(path);
    }
}

mod cli;

use cli::Commands;

/// Télécharger les particelle cadastrales du WFS de l'Agenzia delle Entrate
#[derive(Parser)]
#[command(name = "catasto-tiles")]
#[command(author, version)]
#[command(about = "Download cadastral parcels from the Agenzia delle Entrate WFS, tile by tile")]
#[command(long_about = "Splits the area of interest into tiles below the server feature limit, downloads them one at a time with a fixed pause, then removes identity duplicates and tags identical geometries.\n\nThe GeoJSON result goes to stdout, the report to stderr.")]
struct Cli {
    /// Verbosité : -v pour debug, -vv pour trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// N'afficher que les avertissements et erreurs
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    debug!(config = ?config, "Démarrage");

    match &cli.command {
        Commands::Bbox { corners, crs, run } => cli::cmd_bbox(config, corners, *crs, run).await?,
        Commands::Polygon { input, crs, run } => cli::cmd_polygon(config, input, *crs, run).await?,
        Commands::Line {
            input,
            vertices,
            crs,
            buffer,
            run,
        } => cli::cmd_line(config, input, vertices, *crs, *buffer, run).await?,
        Commands::Lookup { x, y, crs } => cli::cmd_lookup(config, *x, *y, *crs).await?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else {
        [Level::INFO, Level::DEBUG, Level::TRACE][usize::from(verbose.min(2))]
    };

    // RUST_LOG affine, le niveau global vient des options
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout porte le GeoJSON : les logs vont sur stderr
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
