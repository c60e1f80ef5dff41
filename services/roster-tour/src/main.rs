mod config;
mod employees;
mod messages;
mod schema;
mod tour;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rosterkit::database::{RetryPolicy, ScyllaConnection};

#[derive(Parser, Debug)]
#[command(name = "roster-tour")]
#[command(about = "CRUD and page-state pagination walkthrough against ScyllaDB/Cassandra")]
struct Args {
    #[arg(short, long, default_value = "config/roster-tour.yaml")]
    config: String,

    /// Rows per page for the message walk
    #[arg(short, long)]
    page_size: Option<usize>,

    /// Assume the keyspace and tables already exist
    #[arg(long)]
    skip_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(&args.config)?;
    if let Some(page_size) = args.page_size {
        config.tour.page_size = page_size;
        config.validate()?;
    }
    if args.skip_schema {
        config.schema.create = false;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "roster_tour={level},rosterkit={level}",
                    level = config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roster tour against {:?}", config.database.hosts);

    let retry = RetryPolicy::from(&config.connect_retry);
    let database = &config.database;
    let conn = retry
        .execute(move || ScyllaConnection::new(database))
        .await?;
    conn.health_check().await?;

    if config.schema.create {
        schema::ensure_schema(&conn, &config.database.keyspace, &config.schema).await?;
    }
    conn.use_keyspace(&config.database.keyspace).await?;

    let tour = tour::Tour::new(
        Arc::new(conn),
        config.tour.page_size()?,
        config.tour.default_page_size()?,
    );
    tour.run().await?;

    Ok(())
}
