use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::FixedOffset;
use sea_orm::Database;
use tracing::info;

use rollcall_core::tracing::init_tracing;
use rollcall_credentials::config::CredentialsConfig;
use rollcall_credentials::infra::clock::SystemClock;
use rollcall_credentials::infra::grpc::GrpcIdentityDirectory;
use rollcall_credentials::infra::mailer::HttpMailDispatcher;
use rollcall_credentials::infra::secret::RandomSecretGenerator;
use rollcall_credentials::router::build_router;
use rollcall_credentials::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = CredentialsConfig::from_env()?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let directory_channel =
        tonic::transport::Channel::from_shared(config.directory_grpc_url.clone())
            .context("invalid DIRECTORY_GRPC_URL")?
            .connect_lazy();

    let dispatch_timeout = Duration::from_secs(config.dispatch_timeout_secs);
    let mailer = HttpMailDispatcher::new(
        config.mail_api_url,
        config.mail_api_key,
        config.mail_from,
        dispatch_timeout,
    )?;

    let attendance_offset = FixedOffset::east_opt(config.attendance_utc_offset_secs)
        .context("ATTENDANCE_UTC_OFFSET_SECS out of range")?;

    let state = AppState {
        db,
        directory: GrpcIdentityDirectory::new(directory_channel),
        mailer,
        clock: Arc::new(SystemClock),
        secrets: Arc::new(RandomSecretGenerator),
        dispatch_timeout,
        attendance_offset,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.credentials_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("credentials service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
