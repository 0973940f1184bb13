//! E-Election server

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use e_election::{
    api::{self, AppState},
    config::Config,
    crypto::NimHasher,
    db::{
        self,
        repositories::{
            SqlxAuthRepository, SqlxCandidateRepository, SqlxUserRepository, SqlxVoteRepository,
            SqlxVotingAccessRepository,
        },
    },
    services::{
        purge_expired_sessions, spawn_sync_task, AuthServiceImpl, CandidateServiceImpl,
        DownloadServiceImpl, S3Storage, UploadServiceImpl, VoteLog, VoteServiceImpl,
        VotingAccessServiceImpl,
    },
};

/// How often expired sessions are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "e_election=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting e-election server...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!(period = config.election.period, "Configuration loaded");
    if config.election.nim_hash_secret == "change-me" {
        tracing::warn!("Using the default NIM hash secret; set E_ELECTION_NIM_HASH_SECRET");
    }
    if !config.storage.has_credentials() {
        tracing::warn!("Object storage credentials are not configured");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    #[cfg(feature = "demo")]
    demo::seed(&pool, config.election.period).await?;

    let period = config.election.period;
    let hasher = NimHasher::new(&config.election.nim_hash_secret);
    let storage = S3Storage::boxed(&config.storage)?;
    let vote_log = Arc::new(VoteLog::new(&config.vote_log.dir));
    let presign_expiry = config.storage.presign_expiry_secs;

    // Create repositories
    let auth_repo = SqlxAuthRepository::boxed();
    let user_repo = SqlxUserRepository::boxed();
    let candidate_repo = SqlxCandidateRepository::boxed();
    let vote_repo = SqlxVoteRepository::boxed(hasher.clone());
    let access_repo = SqlxVotingAccessRepository::boxed();

    // Initialize services
    let state = AppState {
        pool: pool.clone(),
        auth_service: Arc::new(AuthServiceImpl::new(
            pool.clone(),
            auth_repo.clone(),
            user_repo.clone(),
        )),
        vote_service: Arc::new(VoteServiceImpl::new(
            pool.clone(),
            vote_repo.clone(),
            access_repo.clone(),
            candidate_repo.clone(),
            user_repo.clone(),
            hasher.clone(),
            period,
            vote_log.clone(),
        )),
        voting_access_service: Arc::new(VotingAccessServiceImpl::new(
            pool.clone(),
            access_repo,
            vote_repo.clone(),
            user_repo,
            hasher,
            period,
        )),
        candidate_service: Arc::new(CandidateServiceImpl::new(
            pool.clone(),
            candidate_repo,
            vote_repo,
            storage.clone(),
            period,
            presign_expiry,
        )),
        download_service: Arc::new(DownloadServiceImpl::new(
            storage.clone(),
            config.storage.log_prefix.clone(),
            presign_expiry,
        )),
        upload_service: Arc::new(UploadServiceImpl::new(
            storage.clone(),
            config.storage.candidate_prefix.clone(),
            presign_expiry,
        )),
        session: Arc::new(config.session.clone()),
    };

    // Expired session cleanup
    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = purge_expired_sessions(&pool, &auth_repo).await {
                    tracing::warn!("Failed to purge expired sessions: {:#}", e);
                }
            }
        });
    }

    // Vote log upload
    spawn_sync_task(
        vote_log,
        storage,
        config.storage.log_prefix.clone(),
        Duration::from_secs(config.storage.sync_interval_secs.max(1)),
    );

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Demo data: one admin, one student and two candidates
#[cfg(feature = "demo")]
mod demo {
    use anyhow::Result;
    use e_election::{
        crypto::hash_password,
        db::{
            repositories::{
                CandidateRepository, SqlxCandidateRepository, SqlxUserRepository,
                SqlxVotingAccessRepository, UserRepository, VotingAccessRepository,
            },
            DynDatabasePool,
        },
        models::{Candidate, CreateCandidateInput, User, UserRole, VotingAccess},
    };

    pub async fn seed(pool: &DynDatabasePool, period: i32) -> Result<()> {
        let users = SqlxUserRepository::new();
        let mut tx = pool.begin().await?;

        if users.get_by_nim(&mut tx, "admin").await?.is_some() {
            tx.rollback().await?;
            return Ok(());
        }

        tracing::info!("Demo mode: creating admin (admin/admin123) and student (2207411001/student123)");
        let admin = User::new("admin", "Demo Admin", "-", UserRole::Admin, hash_password("admin123")?);
        users.create(&mut tx, &admin).await?;

        let student = User::new(
            "2207411001",
            "Demo Student",
            "Teknik Informatika",
            UserRole::Student,
            hash_password("student123")?,
        );
        let student = users.create(&mut tx, &student).await?;
        SqlxVotingAccessRepository::new()
            .create(&mut tx, &VotingAccess::new(student.id, period))
            .await?;

        let candidates = SqlxCandidateRepository::new();
        for (number, president, vice) in [(1, "Andi", "Bunga"), (2, "Citra", "Dimas")] {
            let input = CreateCandidateInput {
                number,
                president: president.into(),
                vice: vice.into(),
                president_nim: format!("22074120{:02}", number * 2 - 1),
                vice_nim: format!("22074120{:02}", number * 2),
                president_study_program: "Teknik Informatika".into(),
                vice_study_program: "Teknik Elektro".into(),
                vision: String::new(),
                mission: String::new(),
                photo_key: None,
                period: Some(period),
            };
            candidates.create(&mut tx, &Candidate::from_input(input, period)).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
