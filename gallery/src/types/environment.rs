//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use strum::{Display, EnumString};
use tracing::Level;

use crate::gateway::{GatewayConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_LIST_LIMIT};

/// Shortest signed URL lifetime accepted from configuration
pub const MIN_SIGNED_URL_EXPIRY_SECS: u64 = 5 * 60;
/// Longest signed URL lifetime accepted from configuration
pub const MAX_SIGNED_URL_EXPIRY_SECS: u64 = 60 * 60;
/// Signed URL lifetime when nothing is configured
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 15 * 60;
/// Largest accepted upload when nothing is configured (15 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

const DEVELOPMENT_JWT_SECRET: &str = "gallery-development-secret";

/// Where objects are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StorageBackend {
    /// S3 (`LocalStack` in development)
    S3,
    /// In-process store, development only
    Memory,
}

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack` or the in-memory store)
    Development {
        /// Treat bearer tokens as principal ids without verifying them
        disable_auth: bool,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let disable_auth = env::var("DISABLE_AUTH")
                    .ok()
                    .and_then(|val| val.trim().parse::<bool>().ok())
                    .unwrap_or(false);

                Self::Development { disable_auth }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether bearer tokens are taken as principal ids without verification
    #[must_use]
    pub const fn disable_auth(&self) -> bool {
        matches!(self, Self::Development { disable_auth: true })
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development { .. } => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "images".to_string())
            }
        }
    }

    /// Object store backend; always S3 outside development
    #[must_use]
    pub fn storage_backend(&self) -> StorageBackend {
        match self {
            Self::Production | Self::Staging => StorageBackend::S3,
            Self::Development { .. } => env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(StorageBackend::S3),
        }
    }

    /// Shared secret the identity provider signs access tokens with
    ///
    /// # Panics
    ///
    /// Panics if `IDENTITY_JWT_SECRET` is not set outside development
    #[must_use]
    pub fn jwt_secret(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("IDENTITY_JWT_SECRET")
                .expect("IDENTITY_JWT_SECRET environment variable is not set"),
            Self::Development { .. } => env::var("IDENTITY_JWT_SECRET")
                .unwrap_or_else(|_| DEVELOPMENT_JWT_SECRET.to_string()),
        }
    }

    /// Expected `aud` claim of access tokens; empty disables the check
    #[must_use]
    pub fn jwt_audience(&self) -> Option<String> {
        match env::var("IDENTITY_JWT_AUDIENCE") {
            Ok(aud) if aud.trim().is_empty() => None,
            Ok(aud) => Some(aud.trim().to_string()),
            Err(_) => Some("authenticated".to_string()),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(self.storage_call_timeout())
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Signed URL lifetime in seconds, clamped to 5..=60 minutes
    #[must_use]
    pub fn signed_url_expiry_secs(&self) -> u64 {
        env::var("SIGNED_URL_EXPIRY_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS)
            .clamp(MIN_SIGNED_URL_EXPIRY_SECS, MAX_SIGNED_URL_EXPIRY_SECS)
    }

    /// Maximum number of images per listing
    #[must_use]
    pub fn list_limit(&self) -> usize {
        env::var("LIST_LIMIT")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
    }

    /// Bound applied to each object store call
    #[must_use]
    pub fn storage_call_timeout(&self) -> Duration {
        env::var("STORAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_CALL_TIMEOUT, Duration::from_secs)
    }

    /// Largest accepted upload body in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Gateway tunables derived from the environment
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            signed_url_ttl: Duration::from_secs(self.signed_url_expiry_secs()),
            list_limit: self.list_limit(),
            call_timeout: self.storage_call_timeout(),
        }
    }

    /// Port the HTTP server binds to
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but not a valid port number
    pub fn port(&self) -> Result<u16, std::num::ParseIntError> {
        env::var("PORT").map_or(Ok(8001), |p| p.trim().parse())
    }

    /// Default log level when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development { .. } => Level::DEBUG,
            })
    }
}
