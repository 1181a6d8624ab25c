// Copyright 2023 Remi Bernotavicius

use crate::{Error, Result};
use diesel::prelude::Connection as _;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

pub mod models;
pub mod schema;
pub mod store;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

diesel::define_sql_function! {
    /// Lower-cases with Unicode rules, unlike SQLite's built-in `lower`.
    fn unicode_lower(text: diesel::sql_types::Nullable<diesel::sql_types::Text>)
        -> diesel::sql_types::Nullable<diesel::sql_types::Text>;
}

pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let mut connection = Connection::establish(&path.as_ref().to_string_lossy())?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;
    unicode_lower_utils::register_impl(&mut connection, |text: Option<String>| {
        text.map(|t| t.to_lowercase())
    })?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(Error::Migration)?;
    Ok(connection)
}

#[cfg(test)]
pub fn establish_test_connection() -> Connection {
    establish_connection(":memory:").unwrap()
}

#[test]
fn migrations() {
    let mut conn = establish_test_connection();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.revert_all_migrations(MIGRATIONS).unwrap();
    assert!(conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}

#[test]
fn unicode_lower_is_registered() {
    use diesel::dsl::sql;
    use diesel::sql_types::{Nullable, Text};

    let mut conn = establish_test_connection();
    let lowered: Option<String> = diesel::select(unicode_lower(sql::<Nullable<Text>>(
        "'Torch the CRÈME'",
    )))
    .get_result(&mut conn)
    .unwrap();
    assert_eq!(lowered.as_deref(), Some("torch the crème"));
}
