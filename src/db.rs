use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use crate::err::Error;

/// Connection settings, read once at startup from the standard `PG*`
/// environment variables. Constructed explicitly and handed to the router so
/// the pool has a visible lifecycle instead of living in a global.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: require("PGHOST")?,
            port: match std::env::var("PGPORT") {
                Ok(port) => port
                    .parse()
                    .with_context(|| format!("`PGPORT` is not a valid port: `{}`", port))?,
                Err(_) => 5432,
            },
            user: require("PGUSER")?,
            password: require("PGPASSWORD")?,
            database: require("PGDATABASE")?,
        })
    }

    fn options(&self) -> PgConnectOptions {
        // Require forces TLS but skips certificate verification, matching the
        // managed-Postgres setup this service runs against.
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Require)
    }

    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(10)
            .connect_with(self.options())
            .await
    }

    /// Pool that only dials on first use. Router tests exercise validation
    /// paths through this without a live database.
    pub fn connect_lazy(&self) -> PgPool {
        PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy_with(self.options())
    }
}

fn require(key: &'static str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable `{}`", key))
}

/// Round-trips `SELECT now()` through the pool. Used as the startup probe and
/// by the `/test-db` diagnostic route.
pub async fn ping(pool: &PgPool) -> Result<DateTime<Utc>, Error> {
    sqlx::query_scalar("SELECT now()")
        .fetch_one(pool)
        .await
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test mutates all PG* variables sequentially so the process-global
    // environment is never raced by a second test.
    #[test]
    fn config_comes_from_environment() {
        for key in ["PGHOST", "PGPORT", "PGUSER", "PGPASSWORD", "PGDATABASE"] {
            std::env::remove_var(key);
        }
        assert!(DbConfig::from_env().is_err());

        std::env::set_var("PGHOST", "db.example.edu");
        std::env::set_var("PGUSER", "registrar");
        std::env::set_var("PGPASSWORD", "hunter2");
        std::env::set_var("PGDATABASE", "students");

        let config = DbConfig::from_env().unwrap();
        assert_eq!(config.host, "db.example.edu");
        assert_eq!(config.port, 5432);
        assert_eq!(config.user, "registrar");
        assert_eq!(config.database, "students");

        std::env::set_var("PGPORT", "6432");
        assert_eq!(DbConfig::from_env().unwrap().port, 6432);

        std::env::set_var("PGPORT", "not-a-port");
        assert!(DbConfig::from_env().is_err());

        for key in ["PGHOST", "PGPORT", "PGUSER", "PGPASSWORD", "PGDATABASE"] {
            std::env::remove_var(key);
        }
    }
}
