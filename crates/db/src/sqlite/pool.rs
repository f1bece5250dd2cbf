//! SQLite-Pool fuer die Button-Registry
//!
//! Die Registry besteht aus genau einer Tabelle (`hardware_buttons`, siehe
//! `migrations/0001_hardware_buttons.sql`). Jeder Tastendruck schreibt
//! `press_count`/`last_press`, bei vielen Teams also viele kurze, parallele
//! Schreibzugriffe: WAL plus Busy-Timeout statt sofortigem `SQLITE_BUSY`.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::error::DbError;
use crate::repository::DatabaseConfig;

/// Wartezeit auf einen gesperrten Schreibzugriff
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Button-Registry auf SQLite
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pub(crate) pool: SqlitePool,
}

impl SqliteDb {
    /// Oeffnet (oder erstellt) die Registry-Datenbank und migriert das Schema
    pub async fn oeffnen(config: &DatabaseConfig) -> Result<Self, DbError> {
        let journal = if config.sqlite_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let opts = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(journal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_verbindungen)
            .connect_with(opts)
            .await?;

        info!(
            url = %config.url,
            wal = config.sqlite_wal,
            max_verbindungen = config.max_verbindungen,
            "Button-Registry geoeffnet"
        );

        Self::mit_schema(pool).await
    }

    /// Fluechtige Registry, z.B. fuer Tests
    pub async fn in_memory() -> Result<Self, DbError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Jede In-Memory-Verbindung haette ihre eigene Datenbank
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::mit_schema(pool).await
    }

    async fn mit_schema(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Schema der Button-Registry aktuell");
        Ok(Self { pool })
    }

    /// Health-Check: Datenbank erreichbar und Registry-Tabelle lesbar
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1 FROM hardware_buttons LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ButtonRepository;

    #[tokio::test]
    async fn in_memory_hat_schema() {
        let db = SqliteDb::in_memory().await.unwrap();
        db.ping().await.unwrap();
        assert!(db.alle().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn datei_registry_ueberlebt_neustart() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("buttons.db").display()),
            max_verbindungen: 2,
            sqlite_wal: true,
        };

        let db = SqliteDb::oeffnen(&config).await.unwrap();
        db.registrieren("AA:BB:CC:DD:EE:FF", "1", "Rot").await.unwrap();
        db.pool.close().await;

        // Zweites Oeffnen migriert nicht doppelt und sieht den Button
        let db = SqliteDb::oeffnen(&config).await.unwrap();
        db.ping().await.unwrap();
        let button = db.laden("aa-bb-cc-dd-ee-ff").await.unwrap().unwrap();
        assert_eq!(button.name, "Rot");
    }
}
