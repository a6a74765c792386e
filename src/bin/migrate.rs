use sea_orm_migration::MigratorTrait;
use storefront_api::{config::AppConfig, db::create_orm_conn, migration::Migrator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sea_orm_migration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;

    let pending = Migrator::get_pending_migrations(&orm).await?.len();
    Migrator::up(&orm, None).await?;
    tracing::info!(applied = pending, "schema up to date");
    Ok(())
}
