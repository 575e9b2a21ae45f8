#[cfg(feature = "http_api")]
#[derive(clap::Parser)]
#[command(name = "http", version, about = "Serve the memorization plan over HTTP.")]
struct Args {
    /// Config file (defaults to ./study-plan.toml when present).
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Chapter catalog (JSON or CSV); overrides `[catalog] path`.
    #[arg(long)]
    catalog: Option<std::path::PathBuf>,

    /// Listen address; overrides `[http] addr`.
    #[arg(long, env = "STUDY_PLAN_HTTP_ADDR")]
    addr: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, value_enum, default_value = "text")]
    log_format: study_plan::logging::LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use study_plan::config::{CONFIG_FILE_NAME, load_config_or_default};
    use study_plan::render::load_watermark;
    use study_plan::{PlanMetadata, PlanSession, PreviewScheduler, http_api, load_catalog};

    let args = Args::parse();
    study_plan::logging::init_tracing(args.verbose, args.log_format);

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from(CONFIG_FILE_NAME));
    let config = load_config_or_default(&config_path)?;

    let catalog_path = args.catalog.unwrap_or_else(|| config.catalog.path.clone());
    let catalog = Arc::new(load_catalog(&catalog_path)?);

    let mut metadata = PlanMetadata::default();
    metadata.participant_name = config.plan.participant_name.clone();
    let mut session = PlanSession::new(catalog, metadata)?;
    session.set_pages_per_day(config.plan.pages_per_day)?;

    let watermark = match config.export.watermark_source() {
        Some(source) => load_watermark(&source).await,
        None => None,
    };
    let pdf = config.export.pdf_renderer();
    let preview = Arc::new(PreviewScheduler::with_debounce(
        pdf.clone(),
        config.preview.directory(),
        config.preview.debounce(),
    ));

    let state = http_api::AppState::new(session)
        .with_pdf_renderer(pdf)
        .with_watermark(watermark)
        .with_preview(Arc::clone(&preview));

    let addr: SocketAddr = args.addr.unwrap_or(config.http.addr).parse()?;
    tracing::info!(%addr, catalog = %catalog_path.display(), "study-plan HTTP API listening");
    let result = http_api::serve(addr, state).await;
    preview.shutdown();
    result?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
