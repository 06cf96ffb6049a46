const DEFAULT_DATABASE_URL: &str = "sqlite://kanri.sqlite?mode=rwc";
const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24 * 7;

/// Runtime configuration, read once at startup and passed into the
/// deployment. No module carries its own environment lookups.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let jwt_secret = match std::env::var("KANRI_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                tracing::warn!(
                    "KANRI_JWT_SECRET is not set; using an insecure development secret"
                );
                "insecure-development-secret".to_string()
            }
        };

        let token_expiry_hours = std::env::var("KANRI_TOKEN_EXPIRY_HOURS")
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_TOKEN_EXPIRY_HOURS);

        Self {
            database_url,
            jwt_secret,
            token_expiry_hours,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: "insecure-development-secret".to_string(),
            token_expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
        }
    }
}
