use std::fs;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use foundation::Millis;
use foundation::math::{Coord, EPSG_4326};
use geocoding::{
    GeocoderControlOptions, SearchArea, SearchError, SearchQuery, USER_AGENT, apply_search,
    best_match, decode_places, structured_search_url,
};
use layers::fetch::FetchError;
use layers::markers::MapMarker;
use reqwest::Client;
use surface::selection::SELECT_DURATION_MS;
use surface::{MapContext, SelectionOutcome, ViewerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the Pará de Minas map viewer")]
struct Args {
    /// MapTiler API key (default: MAPTILER_KEY or VITE_MAPTILER_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Request timeout in seconds (default: the configured fetch timeout)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print resolved endpoints and geocoder options
    Config,

    /// Load the overlay features and summarize them
    Overlay,

    /// Search an address ("Rua São Paulo, 123") and place the marker
    Search { text: String },

    /// Apply a geocoder select payload (inline JSON or @path)
    Select { payload: String },

    /// Reproject a coordinate between registered systems
    Reproject {
        #[arg(long, default_value = "EPSG:4326")]
        from: String,
        #[arg(long, default_value = "EPSG:31983")]
        to: String,
        x: f64,
        y: f64,
    },
}

struct Driver {
    ctx: MapContext,
    client: Client,
    started: Instant,
}

impl Driver {
    fn now(&self) -> Millis {
        Millis(self.started.elapsed().as_secs_f64() * 1000.0)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(classify)?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        resp.text().await.map_err(classify)
    }

    /// Finishes any running animation and prints where the view ended up.
    fn settle_and_report(&mut self, marker: &MapMarker) {
        let end = self.now().after(SELECT_DURATION_MS + 1.0);
        self.ctx.tick(end);
        let view = self.ctx.surface().viewport();
        println!("label\t{:?}", marker.label);
        if let Some(full) = &marker.full_address {
            println!("address\t{full}");
        }
        println!("marker\t{:.2}\t{:.2}", marker.position.x, marker.position.y);
        println!(
            "view\t{:.2}\t{:.2}\tzoom {}",
            view.center.x, view.center.y, view.zoom
        );
    }

    fn print_notices(&mut self) {
        for record in self.ctx.diagnostics_mut().drain() {
            println!("{:?}\t{}\t{}", record.severity, record.component, record.message);
        }
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let args = Args::parse();

    let mut config = ViewerConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    let ctx = MapContext::new(config).map_err(|e| e.to_string())?;
    let timeout = match args.timeout_secs {
        Some(secs) => Duration::from_secs(secs),
        None => Duration::try_from_secs_f64(ctx.config().fetch_timeout_ms / 1000.0)
            .map_err(|e| format!("fetch timeout: {e}"))?,
    };
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| e.to_string())?;
    let mut driver = Driver {
        ctx,
        client,
        started: Instant::now(),
    };

    match args.command {
        Command::Config => cmd_config(&driver),
        Command::Overlay => cmd_overlay(&mut driver).await,
        Command::Search { text } => cmd_search(&mut driver, &text).await,
        Command::Select { payload } => cmd_select(&mut driver, &payload),
        Command::Reproject { from, to, x, y } => cmd_reproject(&driver, &from, &to, x, y),
    }
}

fn cmd_config(driver: &Driver) -> Result<(), String> {
    let surface = driver.ctx.surface();
    println!("style\t{}", surface.basemap.style_url);
    println!("features\t{}", surface.overlay.source_url);
    let options = GeocoderControlOptions::from_config(driver.ctx.config());
    println!(
        "geocoder\t{}",
        options.to_json().map_err(|e| e.to_string())?
    );
    let view = surface.viewport();
    println!(
        "view\t{:.2}\t{:.2}\tzoom {}",
        view.center.x, view.center.y, view.zoom
    );
    Ok(())
}

async fn cmd_overlay(driver: &mut Driver) -> Result<(), String> {
    let (ticket, url) = driver.ctx.begin_overlay_fetch();
    info!("fetching overlay features");
    let result = driver.fetch_text(&url).await;
    let now = driver.now();
    match driver.ctx.complete_overlay_fetch(ticket, result, now) {
        Ok(count) => {
            println!("features\t{count}");
            let features = driver.ctx.surface().overlay.features();
            let coords = features
                .features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .flat_map(|g| g.coords());
            if let Some(extent) = foundation::Extent::covering(coords) {
                println!("extent\t{:?}", extent.as_array());
            }
        }
        Err(err) => {
            warn!("overlay degraded: {err}");
            driver.print_notices();
        }
    }
    Ok(())
}

async fn cmd_search(driver: &mut Driver, text: &str) -> Result<(), String> {
    let Some(query) = SearchQuery::parse(text) else {
        return Err("empty search".to_string());
    };
    let area = SearchArea::from_settings(&driver.ctx.config().search);
    let url = structured_search_url(&query, &area);
    info!("searching {url}");

    let hit = driver
        .fetch_text(&url)
        .await
        .map_err(|e| SearchError::Fetch(e.to_string()))
        .and_then(|body| decode_places(&body))
        .and_then(|places| best_match(&query, places));

    let now = driver.now();
    let placed = apply_search(&mut driver.ctx, hit, now);
    let marker = driver.ctx.surface().markers.source.marker().cloned();
    if let (Some(_), Some(marker)) = (&placed, marker) {
        driver.settle_and_report(&marker);
    }
    driver.print_notices();
    match placed {
        Some(_) => Ok(()),
        None => Err("search placed no marker".to_string()),
    }
}

fn cmd_select(driver: &mut Driver, payload: &str) -> Result<(), String> {
    let payload = match payload.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?,
        None => payload.to_string(),
    };
    let now = driver.now();
    let outcome = driver
        .ctx
        .dispatch_select(&payload, now)
        .map_err(|e| e.to_string())?;
    match outcome {
        SelectionOutcome::Ignored => println!("selection ignored (no feature)"),
        SelectionOutcome::Placed(marker) => driver.settle_and_report(&marker),
    }
    Ok(())
}

fn cmd_reproject(driver: &Driver, from: &str, to: &str, x: f64, y: f64) -> Result<(), String> {
    let out = driver
        .ctx
        .registry()
        .transform(from, to, Coord::new(x, y))
        .map_err(|e| e.to_string())?;
    let precision = if to.eq_ignore_ascii_case(EPSG_4326) { 8 } else { 3 };
    println!("{:.precision$}\t{:.precision$}", out.x, out.y);
    Ok(())
}
