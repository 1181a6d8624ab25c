// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use service::{IngredientUpdate, ServiceSettings};
use std::net::SocketAddr;
use std::path::PathBuf;

mod api;
mod database;
mod error;
mod search;
mod service;
#[cfg(test)]
mod test_data;

use error::Error;
type Result<T> = std::result::Result<T, Error>;

/// Recipe storage and search over HTTP.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// SQLite database file, created if missing.
    #[arg(long, env = "RECIPES_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, env = "RECIPES_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Fail searches that name an unknown filter criteria instead of returning nothing.
    #[arg(long, env = "RECIPES_STRICT_CRITERIA")]
    strict_criteria: bool,

    #[arg(
        long,
        env = "RECIPES_INGREDIENT_UPDATE",
        value_enum,
        default_value = "additive"
    )]
    ingredient_update: IngredientUpdate,

    #[arg(long, env = "RECIPES_LOG_LEVEL", default_value = "info")]
    log_level: log::LevelFilter,
}

/// This is where the database lives on-disk by default. On Linux it should be like:
/// `~/.local/share/recipe_service/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "failed to get user home directory",
        )
    })?;
    let path = dirs.data_dir().join("recipe_service");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()?;

    let database = match args.database {
        Some(path) => path,
        None => data_path()?.join("data.sqlite"),
    };
    log::info!("opening database {}", database.display());
    let conn = database::establish_connection(&database)?;

    let settings = ServiceSettings {
        strict_criteria: args.strict_criteria,
        ingredient_update: args.ingredient_update,
    };
    let app = api::router(api::AppState::new(conn, settings));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    log::info!("listening on {}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
