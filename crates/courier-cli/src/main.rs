//! courier - run a scheduler over a SQLite task store.
//!
//! Usage:
//!   courier run                      Dispatch tasks until Ctrl-C
//!   courier enqueue message ...      Add a message task to the store
//!   courier enqueue publish ...      Add a publish task to the store
//!   courier list                     Show pending tasks
//!   courier cancel <KEY>             Remove a pending task
//!
//! `enqueue`, `list` and `cancel` write to the database directly and are safe
//! to run next to `courier run`. The running dispatcher only sees those rows
//! on its next start, so an offline `cancel` does not stop a task it already
//! queued.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier_core::impls::{FanoutPublisher, LogPoster, LogSender, PayloadRouter, SqliteTaskStore};
use courier_core::ports::{KeyGenerator, SystemClock, TaskStore, UlidKeyGenerator};
use courier_core::{
    CourierConfig, DispatcherExit, Platform, ScheduledTask, SchedulerBuilder, TaskKey,
};

/// courier - durable, time-ordered task dispatcher
#[derive(Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "courier.toml")]
    config: PathBuf,

    /// Task database (overrides `store_path` from the config)
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dispatcher until Ctrl-C
    Run {
        /// Maximum concurrent executions (overrides the config)
        #[arg(short = 'j', long)]
        max_in_flight: Option<usize>,
    },

    /// Add a task to the store
    Enqueue {
        #[command(subcommand)]
        task: EnqueueCommand,
    },

    /// List pending tasks, earliest first
    List {
        /// Print JSON records instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Remove a pending task
    Cancel {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[derive(Subcommand)]
enum EnqueueCommand {
    /// Deliver a message to a recipient
    Message {
        #[arg(long)]
        recipient: String,

        #[arg(long)]
        body: String,

        /// Explicit key (default: generated `msg-<ulid>`)
        #[arg(long)]
        key: Option<String>,

        #[command(flatten)]
        when: When,
    },

    /// Publish content to one or more platforms
    Publish {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        content: String,

        /// Repeat for several platforms (twitter, linkedin)
        #[arg(long = "platform", required = true)]
        platforms: Vec<Platform>,

        #[command(flatten)]
        when: When,
    },
}

#[derive(Args)]
struct When {
    /// RFC 3339 timestamp, e.g. 2030-01-01T09:00:00Z
    #[arg(long, conflicts_with = "in_secs")]
    at: Option<DateTime<Utc>>,

    /// Seconds from now (default: 0)
    #[arg(long)]
    in_secs: Option<i64>,
}

impl When {
    fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match (self.at, self.in_secs) {
            (Some(at), _) => Ok(at),
            (None, Some(secs)) => TimeDelta::try_seconds(secs)
                .and_then(|delta| now.checked_add_signed(delta))
                .with_context(|| format!("--in-secs {secs} is out of range")),
            (None, None) => Ok(now),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CourierConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let store = SqliteTaskStore::open(&config.store_path)
        .await
        .with_context(|| format!("opening task store {}", config.store_path.display()))?;

    let result = match cli.command {
        Commands::Run { max_in_flight } => {
            if max_in_flight.is_some() {
                config.scheduler.max_in_flight = max_in_flight;
            }
            run(config, store.clone()).await
        }
        Commands::Enqueue { task } => enqueue(&store, task).await,
        Commands::List { json } => list(&store, json).await,
        Commands::Cancel { key } => cancel(&store, key).await,
    };
    store.close().await;
    result
}

async fn run(config: CourierConfig, store: SqliteTaskStore) -> Result<()> {
    let publisher = Platform::ALL
        .iter()
        .fold(FanoutPublisher::new(), |publisher, &platform| {
            publisher.with_poster(platform, Arc::new(LogPoster::new(platform)))
        });
    let executor = PayloadRouter::new(Arc::new(LogSender), Arc::new(publisher));

    let scheduler = SchedulerBuilder::new(Arc::new(store), Arc::new(executor))
        .config(config.scheduler.clone())
        .start()
        .await?;

    let status = scheduler.status().await;
    info!(
        store = %config.store_path.display(),
        pending = status.pending,
        next_due = ?status.next_due,
        "courier running"
    );

    let exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            scheduler.shutdown().await
        }
        exit = scheduler.closed() => exit,
    };

    let status = scheduler.status().await;
    info!(fired = status.fired, failed = status.failed, pending = status.pending, "courier stopped");
    match exit {
        DispatcherExit::Stopped => Ok(()),
        DispatcherExit::Faulted(reason) => bail!("dispatcher faulted: {reason}"),
    }
}

async fn enqueue(store: &SqliteTaskStore, command: EnqueueCommand) -> Result<()> {
    let now = Utc::now();
    let task = match command {
        EnqueueCommand::Message {
            recipient,
            body,
            key,
            when,
        } => {
            let key = match key {
                Some(key) => TaskKey::new(key),
                None => UlidKeyGenerator::new(SystemClock).generate("msg"),
            };
            ScheduledTask::message(key, when.resolve(now)?, recipient, body)
        }
        EnqueueCommand::Publish {
            owner,
            content,
            platforms,
            when,
        } => ScheduledTask::publish(owner, content, when.resolve(now)?, platforms),
    };

    task.validate()?;
    let key = task.key().clone();
    let scheduled_at = task.scheduled_at();
    store.insert(task).await?;
    info!(task_key = %key, scheduled_at = %scheduled_at, "task stored");
    println!("{key}");
    Ok(())
}

async fn list(store: &SqliteTaskStore, json: bool) -> Result<()> {
    let tasks = store.list_pending().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    if tasks.is_empty() {
        println!("no pending tasks");
        return Ok(());
    }
    for task in &tasks {
        println!(
            "{:<40} {:<8} {}",
            task.key().as_str(),
            task.payload().kind(),
            task.scheduled_at().to_rfc3339()
        );
    }
    Ok(())
}

async fn cancel(store: &SqliteTaskStore, key: String) -> Result<()> {
    store.delete(&TaskKey::new(key.as_str())).await?;
    println!("cancelled {key}");
    Ok(())
}
