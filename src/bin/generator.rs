use std::time::Duration;

use clap::Parser;
use livebridge::{
    config::PostgresConfig,
    db::{self, FixedInterval},
    generator::{DEFAULT_INSERT_INTERVAL, MetricGenerator},
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Seconds between inserted samples
    #[arg(long, default_value_t = DEFAULT_INSERT_INTERVAL.as_secs())]
    interval: u64,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("livebridge", LevelFilter::TRACE),
        ("livebridge_gen", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = PostgresConfig::from_env()?;
    let pool = db::connect_with_retry(&config, FixedInterval::default()).await;

    let generator = MetricGenerator::new(pool.clone(), Duration::from_secs(args.interval));
    generator.prepare().await?;

    let result = tokio::select! {
        result = generator.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("generator stopped: {e:#}");
    }

    pool.close().await;
    info!("postgres connection closed");

    result
}
