use std::sync::Arc;

use helpline_chat::events::{EventDispatcher, SlashCommandHandler, ThreadCreatedHandler};
use helpline_chat::gateway::{GatewayRunner, NoopGatewayTransport, ReconnectPolicy};
use helpline_chat::platform::InMemoryPlatform;
use helpline_chat::service::{HelpThreadCreatedService, HelplineCommandService, HelplineServices};
use helpline_core::config::{AppConfig, ConfigError, LoadOptions};
use helpline_core::errors::{ApplicationError, DomainError};
use helpline_core::help::{HelpSystem, TagAssignmentEngine, TagCatalog, ThreadCategorizationService};
use helpline_core::moderation::{ModerationActionFlow, ModerationPolicy};
use helpline_core::ports::GuildGateway;
use helpline_db::{
    connect_with_settings, migrations, DbPool, SqlHelpThreadRepository,
    SqlModerationActionRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub services: Arc<HelplineServices>,
    pub guilds: Arc<dyn GuildGateway>,
    pub gateway: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("label catalog could not be built: {0}")]
    Catalog(#[source] DomainError),
    #[error("service wiring failed: {0}")]
    Services(#[source] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    // No platform client ships with the workspace yet; the in-process platform
    // stands in until a transport-backed gateway is wired here.
    let platform = Arc::new(InMemoryPlatform::new());

    let catalog =
        Arc::new(TagCatalog::from_config(&config.help_system).map_err(BootstrapError::Catalog)?);
    let policy =
        ModerationPolicy::from_config(&config.moderation).map_err(BootstrapError::Services)?;
    let help = HelpSystem::new(
        config.help_system.clone(),
        platform.clone(),
        platform.clone(),
        Arc::new(SqlHelpThreadRepository::new(db_pool.clone())),
    )
    .map_err(BootstrapError::Services)?;

    let services = Arc::new(HelplineServices {
        categorization: ThreadCategorizationService::new(
            TagAssignmentEngine::new(catalog),
            platform.clone(),
            config.help_system.max_tags_per_thread,
        ),
        help,
        moderation: ModerationActionFlow::new(
            policy,
            platform.clone(),
            platform.clone(),
            Arc::new(SqlModerationActionRepository::new(db_pool.clone())),
        ),
        forums: platform.clone(),
        thread_messenger: platform.clone(),
    });

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(HelplineCommandService::new(services.clone())));
    dispatcher.register(ThreadCreatedHandler::new(HelpThreadCreatedService::new(services.clone())));

    let gateway = GatewayRunner::new(
        Arc::new(NoopGatewayTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        categories = config.help_system.categories.len(),
        max_tags_per_thread = config.help_system.max_tags_per_thread,
        "services wired"
    );

    Ok(Application { config, db_pool, services, guilds: platform, gateway })
}
