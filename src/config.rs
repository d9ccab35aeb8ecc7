use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout: Duration,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bcrypt_cost: u32,
    pub cloudinary: Option<CloudinaryConfig>,
    pub upload_dir: String,
    pub public_base_url: String,
    pub expiry_sweep_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        fn parsed<T: FromStr>(
            var: &'static str,
            value: Option<String>,
            default: T,
        ) -> Result<T, ConfigError> {
            match value {
                None => Ok(default),
                Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
            }
        }

        // Counts and periods where zero is not a usable setting.
        fn positive<T: FromStr + Default + PartialEq>(
            var: &'static str,
            value: Option<String>,
            default: T,
        ) -> Result<T, ConfigError> {
            let raw = value.clone();
            let n = parsed(var, value, default)?;
            if n == T::default() {
                return Err(ConfigError::Invalid {
                    var,
                    value: raw.unwrap_or_default(),
                });
            }
            Ok(n)
        }

        let port: u16 = parsed("PORT", get("PORT"), 5000)?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using the insecure default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let cors_origins = get("CORS_ORIGIN")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let cloudinary = match (
            get("CLOUDINARY_CLOUD_NAME"),
            get("CLOUDINARY_API_KEY"),
            get("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:data/revive.db".to_string()),
            database_max_connections: positive(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                5,
            )?,
            database_acquire_timeout: Duration::from_secs(parsed(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                get("DATABASE_ACQUIRE_TIMEOUT_SECS"),
                5,
            )?),
            port,
            jwt_secret,
            cors_origins,
            admin_username: get("ADMIN_USERNAME"),
            admin_password: get("ADMIN_PASSWORD"),
            bcrypt_cost: parsed("BCRYPT_COST", get("BCRYPT_COST"), bcrypt::DEFAULT_COST)?,
            cloudinary,
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            expiry_sweep_interval: Duration::from_secs(positive(
                "EXPIRY_SWEEP_INTERVAL_SECS",
                get("EXPIRY_SWEEP_INTERVAL_SECS"),
                3600,
            )?),
            request_timeout: Duration::from_secs(positive(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                30,
            )?),
        })
    }
}
