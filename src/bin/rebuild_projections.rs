//! Dashboard rebuild tool
//!
//! Replays event streams from PostgreSQL and overwrites the stored
//! dashboard snapshots.
//!
//! Run with: cargo run --bin rebuild_projections -- [--user <uuid>]

use uuid::Uuid;

use user_dashboard::event_store::PgUserStore;
use user_dashboard::projection::ProjectionService;
use user_dashboard::{db, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let user_id: Option<Uuid> = match args.iter().position(|a| a == "--user") {
        Some(i) => {
            let raw = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--user requires a user id"))?;
            Some(raw.parse()?)
        }
        None => None,
    };

    let config = Config::from_env()?;
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

    println!("Connecting to database...");
    let pool = db::connect(&database_url, &config).await?;
    db::verify_connection(&pool).await?;

    let store = PgUserStore::new(pool.clone());
    let projection = ProjectionService::default();

    match user_id {
        Some(user_id) => match projection.rebuild(&store, user_id).await? {
            Some(view) => println!(
                "Rebuilt dashboard for {} at version {} (balance {})",
                user_id, view.version, view.current_total_wallet_balance
            ),
            None => println!("No events found for {}", user_id),
        },
        None => {
            let report = projection.rebuild_all(&store).await?;
            println!("\n=== Rebuild Results ===");
            println!("Rebuilt: {}", report.rebuilt);
            println!("Skipped (empty streams): {}", report.skipped);
            println!("Failed: {}", report.failed.len());
            for (stream_id, error) in &report.failed {
                println!("  {}: {}", stream_id, error);
            }
        }
    }

    pool.close().await;
    Ok(())
}
