use dotenvy::dotenv;
use envelope_transition::{
    config::{database, settings},
    core::{
        envelope::build_envelopes,
        orchestrator::{MonthTransition, format_transition_summary},
        period,
        preferences::load_preferences,
        store::{BudgetStore, SeaOrmStore},
    },
    errors::{Error, Result},
};
use sea_orm::TransactionTrait;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings and the dashboard to transition
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    let dashboard_id = env::var("DASHBOARD_ID").map_err(|e| Error::Config {
        message: format!("DASHBOARD_ID not set: {e}"),
    })?;

    // 4. Database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    let today = chrono::Local::now().date_naive();
    let store = SeaOrmStore::new(&db);
    if settings.skip_if_already_transitioned
        && !period::is_transition_due(&store, &dashboard_id, today).await?
    {
        info!(
            "Dashboard '{}' was already transitioned this month, nothing to do.",
            dashboard_id
        );
        return Ok(());
    }

    // 5. Snapshot with last period's choices
    let budgets = store.get_budgets(&dashboard_id).await?;
    let preferences = load_preferences(&store, &dashboard_id).await?;
    let envelopes = build_envelopes(&budgets, preferences.as_deref());
    info!("Built {} envelopes for '{}'", envelopes.len(), dashboard_id);

    // 6. Run the transition inside one database transaction
    let txn = db.begin().await?;
    let report = {
        let txn_store = SeaOrmStore::new(&txn);
        MonthTransition::new(&txn_store, dashboard_id.as_str(), settings, today)
            .run(&envelopes)
            .await
    };

    if report.is_success() {
        txn.commit().await?;
    } else {
        txn.rollback().await?;
        info!("Rolled back all changes.");
    }

    println!("{}", format_transition_summary(&report));

    match report.failure {
        Some(failure) => Err(failure.error),
        None => Ok(()),
    }
}
