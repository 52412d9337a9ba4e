use tracing::Instrument;
use tracing_subscriber::EnvFilter;

use bookprice_scraper::baseline::PriceBaseline;
use bookprice_scraper::config::Config;
use bookprice_scraper::crawler::service::ScrapeService;
use bookprice_scraper::storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;
    let site = cfg.site;
    let output_file = cfg.output_file.clone();
    let span = tracing::info_span!("job", id = %cfg.job_id, site = %site);

    let categories = storage::dataset::load_categories(&cfg.categories_file)?;
    let baseline = PriceBaseline::load_or_empty(&cfg.history_file);

    let service = ScrapeService::new(cfg, baseline)?;

    let cancel = service.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting outstanding fetches");
            cancel.cancel();
        }
    });

    let report = service.run(&categories).instrument(span).await;

    storage::dataset::write_records(&output_file, site, &report.records)?;

    println!("\n==============================");
    println!("PRICE CHANGES RECORDED: {}", report.records.len());
    println!("CATEGORIES FAILED:      {}", report.failures.len());
    println!("PAGES LOST:             {}", report.failed_pages.len());
    println!("==============================\n");

    Ok(())
}
