use media_generator::services::{PgStatsStore, StatsStore};
use sqlx::postgres::PgPool;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    println!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    println!("Checking generations table...");
    let result = sqlx::query("SELECT COUNT(*) FROM generations")
        .fetch_one(&pool)
        .await;

    match result {
        Ok(_) => println!("✅ generations table EXISTS"),
        Err(e) => {
            println!("❌ generations table NOT FOUND: {}", e);
            println!("Start the server once to run migrations.");
            return Ok(());
        }
    }

    println!("\nApplied migrations:");
    let migrations = sqlx::query_as::<_, (i64, String)>(
        "SELECT version, description FROM _sqlx_migrations ORDER BY version DESC",
    )
    .fetch_all(&pool)
    .await;

    match migrations {
        Ok(migrations) => {
            for (version, description) in migrations {
                println!("  - {} {}", version, description);
            }
        }
        Err(e) => println!("❌ Error querying _sqlx_migrations: {}", e),
    }

    let stats = PgStatsStore::new(pool).get_statistics().await?;
    println!("\n📊 Statistics");
    println!("  total:        {}", stats.total_generations);
    println!("  today:        {}", stats.today_generations);
    println!("  images:       {}", stats.image_generations);
    println!("  videos:       {}", stats.video_generations);
    println!("  success rate: {}%", stats.success_rate);

    Ok(())
}
