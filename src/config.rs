use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

/// Connection settings for the user database.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.166".into(),
            port: 5432,
            database: "exampledb".into(),
            user: "user1".into(),
            password: "123456".into(),
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            database: std::env::var("DB_NAME").unwrap_or(defaults.database),
            user: std::env::var("DB_USER").unwrap_or(defaults.user),
            password: std::env::var("DB_PASSWORD").unwrap_or(defaults.password),
        }
    }

    /// Options for `PgConnection::connect_with`; values are never
    /// interpolated into a URL string.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            db: DbConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_fallbacks() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.host, "192.168.0.166");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.database, "exampledb");
        assert_eq!(cfg.user, "user1");
        assert_eq!(cfg.password, "123456");
    }

    #[test]
    fn connect_options_carry_host_and_database() {
        let cfg = DbConfig::default();
        let opts = cfg.connect_options();
        assert_eq!(opts.get_host(), "192.168.0.166");
        assert_eq!(opts.get_database(), Some("exampledb"));
    }
}
