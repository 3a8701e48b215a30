use clap::Parser;
use livebridge::{
    config::{DecodeErrorPolicy, PostgresConfig},
    db::{self, FixedInterval},
    forward::{SAMPLE_BUFFER, StreamForwarder},
    listener::NotificationListener,
};
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Notification channel to listen on
    #[arg(long, default_value = "influx_feed")]
    channel: String,

    /// Websocket endpoint of the streaming sink
    #[arg(long, default_value = "ws://grafana:3000/api/live/push/my_stream_id")]
    sink_url: String,

    /// What to do when a notification payload fails to decode
    #[arg(long, value_enum, default_value = "fail")]
    decode_errors: DecodeErrorPolicy,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_target("livebridge", LevelFilter::TRACE);
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

    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let forwarder = tokio::spawn(StreamForwarder::new(args.sink_url, sample_rx).run());

    let pg_listener = PgListener::connect_with(&pool).await?;
    let mut listener =
        NotificationListener::new(pg_listener, args.channel, sample_tx, args.decode_errors);
    listener.subscribe().await?;

    let result = tokio::select! {
        result = listener.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("bridge stopped: {e:#}");
    }

    // The listener and its channel sender are gone at this point; let the
    // forwarder flush in-flight samples before closing the connection.
    let _ = forwarder.await;
    pool.close().await;
    info!("postgres connection closed");

    result
}
