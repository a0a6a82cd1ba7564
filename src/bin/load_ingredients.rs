use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use foodgram_sdk::{actions, schema::IngredientDraft};
use sqlx::postgres::PgPoolOptions;

/// Loads ingredients from a JSON list of `{"name", "measurement_unit"}`
/// objects. Ingredients already present are skipped.
#[derive(Parser)]
#[command(name = "load-ingredients")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Database URL, defaults to $DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

async fn run(cli: Cli) -> Result<(), String> {
    let contents = tokio::fs::read_to_string(&cli.file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", cli.file.display()))?;
    let drafts: Vec<IngredientDraft> =
        serde_json::from_str(&contents).map_err(|e| format!("Invalid ingredient file: {e}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await
        .map_err(|e| format!("Failed to connect to database: {e}"))?;

    let describe = |e: potion::Error| e.info.unwrap_or_else(|| String::from("Unknown error"));

    actions::run_migrations(&pool).await.map_err(describe)?;
    let (created, skipped) = actions::load_ingredients(&drafts, &pool)
        .await
        .map_err(describe)?;

    log::info!(
        "Loaded {} ingredients from {}: {created} created, {skipped} skipped",
        drafts.len(),
        cli.file.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
