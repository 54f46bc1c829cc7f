use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// HTTP listen port (default: 3008)
    pub port: u16,

    /// FCM server key used to authorize gateway calls
    pub fcm_server_key: String,

    /// FCM multicast endpoint (default: the public legacy send URL)
    pub fcm_endpoint: String,

    /// Device registration TTL in hours (default: 24)
    pub registration_ttl_hours: i64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3008".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
            fcm_server_key: std::env::var("FCM_SERVER_KEY")
                .map_err(|_| anyhow::anyhow!("FCM_SERVER_KEY environment variable is required"))?,
            fcm_endpoint: std::env::var("FCM_ENDPOINT")
                .unwrap_or_else(|_| "https://fcm.googleapis.com/fcm/send".to_string()),
            registration_ttl_hours: std::env::var("REGISTRATION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REGISTRATION_TTL_HOURS must be a valid i64"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
        })
    }
}
