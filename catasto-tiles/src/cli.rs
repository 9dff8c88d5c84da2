//! Définition et implémentation des commandes CLI
//!
//! - `bbox` : rectangle défini par deux coins
//! - `polygon` : emprise d'un polygone, filtrée par le polygone
//! - `line` : buffer d'une ligne en CRS métrique
//! - `lookup` : parcelle sous un point

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPolygon};
use tracing::{info, warn};

use catasto_tiles::acquisition::{self, PlannedRun};
use catasto_tiles::area::{AreaNormalizer, AreaRequest, GeometryKind};
use catasto_tiles::export::{GeoJsonSink, ResultSink, SinkOptions};
use catasto_tiles::fetch::{CancelSignal, WfsClient};
use catasto_tiles::lookup::lookup;
use catasto_tiles::session::{PolylineSession, RectangleSession};
use catasto_tiles::{Config, Crs};

#[derive(Subcommand)]
pub enum Commands {
    /// Download parcels inside a rectangle given by two opposite corners
    Bbox {
        /// Corner as X,Y (lon,lat for geographic CRS); give it twice
        #[arg(long = "corner", value_parser = parse_coord, required = true, allow_hyphen_values = true)]
        corners: Vec<Coord>,

        /// CRS of the corners
        #[arg(long, default_value = "EPSG:6706")]
        crs: Crs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Download parcels intersecting a polygon
    Polygon {
        #[command(flatten)]
        input: GeometryInput,

        /// CRS of the polygon
        #[arg(long, default_value = "EPSG:6706")]
        crs: Crs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Download parcels along a buffered line (projected CRS in metres)
    Line {
        #[command(flatten)]
        input: GeometryInput,

        /// Line vertex as X,Y (repeat, in order)
        #[arg(
            long = "vertex",
            value_parser = parse_coord,
            allow_hyphen_values = true,
            conflicts_with_all = ["wkt", "geojson"]
        )]
        vertices: Vec<Coord>,

        /// Projected CRS of the line (e.g. EPSG:32633)
        #[arg(long)]
        crs: Crs,

        /// Buffer distance in metres, (0, 100]
        #[arg(long)]
        buffer: Option<f64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the parcel under a point as a 7-field JSON array
    Lookup {
        #[arg(long, allow_hyphen_values = true)]
        x: f64,

        #[arg(long, allow_hyphen_values = true)]
        y: f64,

        /// CRS of the point
        #[arg(long, default_value = "EPSG:6706")]
        crs: Crs,
    },
}

/// Géométrie fournie en WKT ou dans un fichier GeoJSON
#[derive(Args)]
pub struct GeometryInput {
    /// Geometry as WKT
    #[arg(long, conflicts_with = "geojson")]
    pub wkt: Option<String>,

    /// GeoJSON file (Geometry, Feature or FeatureCollection)
    #[arg(long)]
    pub geojson: Option<PathBuf>,
}

/// Options communes des commandes d'acquisition
#[derive(Args)]
pub struct RunArgs {
    /// Maximum tile area in km² (default 4)
    #[arg(long)]
    pub max_tile_km2: Option<f64>,

    /// Pause between two requests, in seconds (default 5)
    #[arg(long)]
    pub pacing: Option<u64>,

    /// Print the tile plan and exit without any request
    #[arg(long)]
    pub dry_run: bool,

    /// Add sezione, foglio, allegato and sviluppo from nationalCadastralReference
    #[arg(long)]
    pub expand_reference: bool,

    /// Only output features whose geometry is duplicated
    #[arg(long)]
    pub only_duplicates: bool,

    /// Print the acquisition report as JSON on stderr
    #[arg(long)]
    pub report_json: bool,
}

impl RunArgs {
    fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            only_duplicates: self.only_duplicates,
            expand_reference: self.expand_reference,
        }
    }
}

/// Parse un point `X,Y`
fn parse_coord(s: &str) -> Result<Coord, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("invalid X in '{}'", s))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("invalid Y in '{}'", s))?;
    Ok(Coord { x, y })
}

/// Configuration : défauts → fichier → environnement → options CLI
pub fn build_config(
    path: Option<&Path>,
    max_tile_km2: Option<f64>,
    pacing: Option<u64>,
    buffer: Option<f64>,
) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(v) = max_tile_km2 {
        config.max_tile_area_km2 = v;
    }
    if let Some(v) = pacing {
        config.pacing_secs = v;
    }
    if let Some(v) = buffer {
        config.buffer_distance_m = v;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Exécute `bbox`
pub async fn cmd_bbox(
    config_path: Option<&Path>,
    corners: &[Coord],
    crs: Crs,
    run: &RunArgs,
) -> Result<()> {
    if corners.len() != 2 {
        bail!("bbox needs exactly 2 --corner values, got {}", corners.len());
    }

    let mut session = RectangleSession::new(crs);
    session.start();
    for corner in corners {
        session.click(*corner)?;
    }
    let request = session
        .request()
        .context("Rectangle selection not confirmed")?;

    let config = build_config(config_path, run.max_tile_km2, run.pacing, None)?;
    cmd_acquire(&config, &request, run).await
}

/// Exécute `polygon`
pub async fn cmd_polygon(
    config_path: Option<&Path>,
    input: &GeometryInput,
    crs: Crs,
    run: &RunArgs,
) -> Result<()> {
    let geometry = read_geometry(input)?;
    if GeometryKind::of(&geometry) != Some(GeometryKind::Polygon) {
        bail!("polygon expects a polygonal geometry, got {:?}", GeometryKind::of(&geometry));
    }

    let config = build_config(config_path, run.max_tile_km2, run.pacing, None)?;
    let request = AreaRequest::from_geometry(geometry, crs, config.buffer_distance_m)?;
    cmd_acquire(&config, &request, run).await
}

/// Exécute `line`
pub async fn cmd_line(
    config_path: Option<&Path>,
    input: &GeometryInput,
    vertices: &[Coord],
    crs: Crs,
    buffer: Option<f64>,
    run: &RunArgs,
) -> Result<()> {
    let config = build_config(config_path, run.max_tile_km2, run.pacing, buffer)?;

    let request = if vertices.is_empty() {
        let geometry = read_geometry(input)?;
        if GeometryKind::of(&geometry) != Some(GeometryKind::Line) {
            bail!("line expects a linear geometry, got {:?}", GeometryKind::of(&geometry));
        }
        AreaRequest::from_geometry(geometry, crs, config.buffer_distance_m)?
    } else {
        let mut session = PolylineSession::new(crs);
        session.start();
        for vertex in vertices {
            session.add_vertex(*vertex)?;
        }
        session.finish()?;
        session
            .request(config.buffer_distance_m)
            .context("Line selection not confirmed")?
    };

    cmd_acquire(&config, &request, run).await
}

/// Exécute `lookup`
pub async fn cmd_lookup(config_path: Option<&Path>, x: f64, y: f64, crs: Crs) -> Result<()> {
    let config = build_config(config_path, None, None, None)?;
    let client = WfsClient::new(&config)?;
    let normalizer = AreaNormalizer::new(config.service_crs);

    let info = lookup(&client, &normalizer, Coord { x, y }, crs)
        .await
        .context("Parcel lookup failed")?;
    info!(reference = %info.reference, "Parcelle trouvée");

    println!("{}", serde_json::to_string(&info.into_tuple())?);
    Ok(())
}

/// Plan, téléchargement, réconciliation et écriture du GeoJSON sur stdout
async fn cmd_acquire(config: &Config, request: &AreaRequest, run: &RunArgs) -> Result<()> {
    let planned = acquisition::plan(config, request).context("Failed to plan acquisition")?;

    if run.dry_run {
        print_plan(&mut std::io::stdout().lock(), &planned)
            .context("Failed to write plan to stdout")?;
        return Ok(());
    }

    let client = WfsClient::new(config)?;
    let cancel = CancelSignal::new();
    spawn_ctrl_c(cancel.clone());

    eprintln!(
        "Downloading {} tiles (~{}s)...",
        planned.plan.len(),
        planned.estimated_duration().as_secs()
    );
    let result = acquisition::execute(&planned, &client, &cancel).await;

    let stdout = std::io::stdout();
    let mut sink = GeoJsonSink::new(
        BufWriter::new(stdout.lock()),
        config.service_crs,
        run.sink_options(),
    );
    sink.write(&result.features, &result.report)
        .context("Failed to write GeoJSON")?;

    result.report.display();
    if run.report_json {
        eprintln!("{}", serde_json::to_string_pretty(&result.report)?);
    }

    Ok(())
}

/// Ctrl-C lève le signal d'annulation ; le résultat partiel est conservé
fn spawn_ctrl_c(cancel: CancelSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interruption demandée, arrêt après la requête en cours");
            cancel.cancel();
        }
    });
}

fn print_plan<W: Write>(out: &mut W, planned: &PlannedRun) -> std::io::Result<()> {
    let plan = &planned.plan;
    writeln!(out, "=== Plan ===")?;
    writeln!(out, "BBox: {}", planned.area.bbox)?;
    writeln!(out, "Estimated area: {:.2} km²", plan.area_km2)?;
    writeln!(out, "Filter geometry: {}", planned.area.filter.is_some())?;
    writeln!(
        out,
        "Grid: {}x{} ({} needed, {} skipped by filter, {} to download)",
        plan.rows,
        plan.cols,
        plan.required,
        plan.skipped,
        plan.len()
    )?;
    writeln!(
        out,
        "Estimated duration: {}s (pacing {}s)",
        planned.estimated_duration().as_secs(),
        planned.pacing.as_secs()
    )?;
    for tile in &plan.tiles {
        writeln!(out, "  [{},{}] {}", tile.row, tile.col, tile.bbox)?;
    }
    Ok(())
}

/// Lit la géométrie d'entrée (WKT ou fichier GeoJSON)
fn read_geometry(input: &GeometryInput) -> Result<Geometry> {
    match (&input.wkt, &input.geojson) {
        (Some(text), _) => parse_wkt(text),
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .context(format!("Failed to read GeoJSON file: {}", path.display()))?;
            parse_geojson(&content)
        }
        (None, None) => bail!("a geometry is required (--wkt or --geojson)"),
    }
}

fn parse_wkt(text: &str) -> Result<Geometry> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| anyhow::anyhow!("Invalid WKT: {}", e))?;
    let geometry: Geometry = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| anyhow::anyhow!("Unsupported WKT: {:?}", e))?;
    Ok(geometry)
}

fn parse_geojson(content: &str) -> Result<Geometry> {
    let parsed: geojson::GeoJson = content.parse().context("Invalid GeoJSON")?;
    let geometry: Geometry = Geometry::try_from(parsed).context("Unsupported GeoJSON geometry")?;
    flatten_collection(geometry)
}

/// Une FeatureCollection devient une collection : on la ramène à un type homogène
fn flatten_collection(geometry: Geometry) -> Result<Geometry> {
    let Geometry::GeometryCollection(collection) = geometry else {
        return Ok(geometry);
    };

    let mut polygons = Vec::new();
    let mut lines: Vec<LineString> = Vec::new();
    for member in collection.0 {
        match member {
            Geometry::Polygon(p) => polygons.push(p),
            Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
            Geometry::LineString(ls) => lines.push(ls),
            Geometry::MultiLineString(mls) => lines.extend(mls.0),
            other => bail!("unsupported member in collection: {:?}", GeometryKind::of(&other)),
        }
    }

    match (polygons.is_empty(), lines.is_empty()) {
        (false, true) => Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
        (true, false) => Ok(Geometry::MultiLineString(MultiLineString::new(lines))),
        (true, true) => bail!("empty geometry collection"),
        (false, false) => bail!("collection mixes polygons and lines"),
    }
}
