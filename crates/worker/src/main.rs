use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollen_core::cache::coordinator::PollenService;
use pollen_core::cache::CacheStore;
use pollen_core::domain::pollen::SourceKind;

mod report;

#[derive(Debug, Parser)]
#[command(name = "pollen_worker")]
struct Args {
    /// Print the synthetic dataset without contacting the source.
    #[arg(long, conflicts_with = "html")]
    mock: bool,

    /// Parse a saved report page instead of fetching it.
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Exit with status 2 when the result fell back to synthetic data.
    #[arg(long)]
    strict: bool,

    /// Single-line JSON.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = pollen_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let data = if args.mock {
        pollen_core::mock::generate(&settings.thresholds)
    } else if let Some(path) = args.html.as_deref() {
        match report::from_html_file(&settings, path) {
            Ok(data) => data,
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %format!("{err:#}"), "report file run failed");
                return Err(err);
            }
        }
    } else {
        let service = PollenService::from_settings(&settings, Arc::new(CacheStore::new()))?;
        let served = service.pollen_data().await;
        served.data.as_ref().clone()
    };

    println!("{}", report::render(&data, args.compact)?);

    tracing::info!(
        kind = data.source.kind.as_str(),
        count = data.current.count,
        level = %data.current.level,
        report_date = %data.source.report_date,
        "pollen run finished"
    );

    if args.strict && data.source.kind == SourceKind::Synthetic {
        tracing::warn!("strict run served synthetic data");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_sentry(settings: &pollen_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
