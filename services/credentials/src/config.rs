use anyhow::Context as _;

const DEFAULT_MAIL_FROM: &str = "Rollcall <no-reply@rollcall.local>";

/// Credential service configuration loaded from environment variables.
#[derive(Debug)]
pub struct CredentialsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Identity directory gRPC URL (e.g. "http://directory:50051"). Env var: `DIRECTORY_GRPC_URL`.
    pub directory_grpc_url: String,
    /// Transactional mail endpoint that receives login codes.
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    /// TCP port to listen on (default 3120). Env var: `CREDENTIALS_PORT`.
    pub credentials_port: u16,
    /// Upper bound on a single notification dispatch (default 10).
    pub dispatch_timeout_secs: u64,
    /// Offset from UTC that decides the attendance calendar date (default 0).
    pub attendance_utc_offset_secs: i32,
}

impl CredentialsConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            directory_grpc_url: required("DIRECTORY_GRPC_URL")?,
            mail_api_url: required("MAIL_API_URL")?,
            mail_api_key: required("MAIL_API_KEY")?,
            mail_from: std::env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_owned()),
            credentials_port: parsed_or("CREDENTIALS_PORT", 3120)?,
            dispatch_timeout_secs: parsed_or("DISPATCH_TIMEOUT_SECS", 10)?,
            attendance_utc_offset_secs: parsed_or("ATTENDANCE_UTC_OFFSET_SECS", 0)?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} is not valid: {raw:?}")),
        Err(_) => Ok(default),
    }
}
