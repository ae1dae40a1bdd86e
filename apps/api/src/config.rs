use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::chat::image::ImageAmountPolicy;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub llm: LlmConfig,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Deadline for one extraction gateway operation.
    pub extraction_timeout: Duration,
    /// Deadline for one repository or ledger call.
    pub repository_timeout: Duration,
    pub max_upload_bytes: usize,
    pub image_amount_policy: ImageAmountPolicy,
    pub port: u16,
    pub rust_log: String,
}

/// Connection settings for the OpenAI-compatible model server.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_bucket = require_env("S3_BUCKET")?;
        let s3_endpoint = require_env("S3_ENDPOINT")?;
        let s3_public_url = std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| {
            format!("{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket)
        });

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            llm: LlmConfig {
                api_base: require_env("LLM_API_BASE")?,
                api_key: require_env("LLM_API_KEY")?,
                model: require_env("LLM_MODEL")?,
                request_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
            },
            s3_bucket,
            s3_endpoint,
            s3_public_url,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            extraction_timeout: Duration::from_secs(parse_env("EXTRACTION_TIMEOUT_SECS", 90)?),
            repository_timeout: Duration::from_secs(parse_env("REPOSITORY_TIMEOUT_SECS", 10)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            image_amount_policy: image_amount_policy()?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// `IMAGE_AMOUNT_POLICY`: `force_expense` (default) or `as_extracted`.
fn image_amount_policy() -> Result<ImageAmountPolicy> {
    match std::env::var("IMAGE_AMOUNT_POLICY").as_deref() {
        Err(_) | Ok("force_expense") => Ok(ImageAmountPolicy::ForceExpense),
        Ok("as_extracted") => Ok(ImageAmountPolicy::AsExtracted),
        Ok(other) => bail!(
            "IMAGE_AMOUNT_POLICY must be 'force_expense' or 'as_extracted', got '{other}'"
        ),
    }
}
