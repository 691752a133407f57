use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use storage::dto::{GenerateBracketsRequest, RecordResultRequest, VoidMatchRequest};
use storage::models::{BracketFormat, WinMethod};
use storage::{CompetitionService, Database, PgCompetitionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "judo-officials")]
#[command(about = "Bracket generation and result entry for judo event officials", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Generate every bracket of an event from a JSON entry list
    Generate {
        #[arg(long)]
        event: Uuid,

        #[arg(long)]
        input: PathBuf,

        /// Force a format for a category, e.g. M-60=SINGLE_ELIMINATION
        #[arg(long = "format", value_parser = parse_format_override)]
        formats: Vec<(String, BracketFormat)>,
    },
    /// List the brackets of an event
    Brackets {
        #[arg(long)]
        event: Uuid,
    },
    /// Record a match result and advance the bracket
    Record {
        #[arg(long = "match")]
        match_id: Uuid,

        #[arg(long)]
        winner: Uuid,

        #[arg(long)]
        method: WinMethod,

        #[arg(long)]
        officiant: Option<Uuid>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Close a scheduled match without a winner
    Void {
        #[arg(long = "match")]
        match_id: Uuid,

        #[arg(long)]
        reason: String,

        #[arg(long)]
        officiant: Option<Uuid>,
    },
    /// Round-robin standings of a bracket
    Standings {
        #[arg(long)]
        bracket: Uuid,
    },
    /// Generate the official results of an event
    Results {
        #[arg(long)]
        event: Uuid,
    },
    /// Delete a bracket's matches so it can be generated again
    Clear {
        #[arg(long)]
        bracket: Uuid,
    },
    /// Compare a bracket's slots with what its recorded results imply
    Audit {
        #[arg(long)]
        bracket: Uuid,
    },
}

fn parse_format_override(raw: &str) -> Result<(String, BracketFormat), String> {
    let (category, format) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=FORMAT, got '{}'", raw))?;

    let category = category.trim();
    if category.is_empty() {
        return Err(format!("missing category in '{}'", raw));
    }

    let format = format.parse::<BracketFormat>().map_err(|e| e.to_string())?;
    Ok((category.to_string(), format))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("judo_officials={},storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!(
        "Connecting to database at: {}",
        cli.database_url.split('@').next_back().unwrap_or("unknown")
    );
    let db = Database::new(&cli.database_url, config.max_connections)
        .await
        .context("Failed to initialize database")?;

    if let Commands::Migrate = cli.command {
        db.run_migrations()
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations completed successfully");
        return Ok(());
    }

    let service: CompetitionService<PgCompetitionStore> = CompetitionService::new(
        db.competition_store(),
        config.fight_points()?,
        Arc::new(config.belt_groups()?),
    );

    match cli.command {
        Commands::Migrate => {}
        Commands::Generate {
            event,
            input,
            formats,
        } => {
            let raw = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Cannot read entry list {}", input.display()))?;
            let mut request: GenerateBracketsRequest = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid entry list {}", input.display()))?;
            request.format_overrides.extend(formats);

            let brackets = service.generate_brackets(event, request).await?;
            if brackets.is_empty() {
                tracing::warn!("No bracket generated, every registrant was skipped");
            }
            print_json(&brackets)?;
        }
        Commands::Brackets { event } => {
            print_json(&service.brackets(event).await?)?;
        }
        Commands::Record {
            match_id,
            winner,
            method,
            officiant,
            notes,
        } => {
            let request = RecordResultRequest {
                winner: Some(winner),
                win_method: Some(method),
                officiant,
                notes,
            };
            print_json(&service.record_match_result(match_id, request).await?)?;
        }
        Commands::Void {
            match_id,
            reason,
            officiant,
        } => {
            let request = VoidMatchRequest { reason, officiant };
            print_json(&service.void_match(match_id, request).await?)?;
        }
        Commands::Standings { bracket } => {
            print_json(&service.compute_standings(bracket).await?)?;
        }
        Commands::Results { event } => {
            let written = service.generate_official_results(event).await?;
            tracing::info!("{} official results written", written);
            print_json(&service.official_results(event).await?)?;
        }
        Commands::Clear { bracket } => {
            service.clear_bracket(bracket).await?;
            print_json(&serde_json::json!({ "bracket_id": bracket, "cleared": true }))?;
        }
        Commands::Audit { bracket } => {
            let projection = service.bracket_projection(bracket).await?;
            print_json(&projection)?;
            if !projection.is_consistent() {
                bail!(
                    "bracket {} has {} drifting slots",
                    bracket,
                    projection.drift.len()
                );
            }
        }
    }

    Ok(())
}
