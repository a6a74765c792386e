use std::{env, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    pub db_timeout: Duration,
    pub cache_timeout: Duration,
    pub review_url_base: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let review_url_base = env::var("REVIEW_URL_BASE")
            .unwrap_or_else(|_| "http://localhost:3000/review".to_string());

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 720),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 300)),
            cache_capacity: parse_or("CACHE_CAPACITY", 10_000),
            db_timeout: Duration::from_millis(parse_or("DB_TIMEOUT_MS", 5_000)),
            cache_timeout: Duration::from_millis(parse_or("CACHE_TIMEOUT_MS", 250)),
            review_url_base,
        })
    }

    /// Configuration for tests and tooling that do not read the environment.
    pub fn for_database(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: 720,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 10_000,
            db_timeout: Duration::from_millis(5_000),
            cache_timeout: Duration::from_millis(250),
            review_url_base: "http://localhost:3000/review".to_string(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
