use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

// Seeds polls from polls.txt: one poll per line, title and options
// separated by '|'. Lines starting with '#' are comments.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("Connected to database!");

    let seed_user = env::var("SEED_USER_ID").unwrap_or_else(|_| "seed".to_string());
    let content = std::fs::read_to_string("polls.txt")
        .expect("Failed to read polls.txt - make sure it exists!");

    let mut count = 0;
    let mut skipped = 0;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split('|').map(str::trim);
        let Some(title) = parts.next().filter(|t| !t.is_empty()) else {
            continue;
        };
        let options: Vec<&str> = parts.filter(|o| !o.is_empty()).collect();

        if options.len() < 2 {
            println!("⊘ Skipped (needs at least 2 options): {title}");
            skipped += 1;
            continue;
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE title = $1)")
            .bind(title)
            .fetch_one(&db)
            .await?;

        if exists {
            println!("⊘ Skipped (duplicate): {title}");
            skipped += 1;
            continue;
        }

        let poll_id: Uuid = sqlx::query_scalar(
            "INSERT INTO polls (title, created_by, is_public) VALUES ($1, $2, TRUE) RETURNING id",
        )
        .bind(title)
        .bind(&seed_user)
        .fetch_one(&db)
        .await?;

        for text in &options {
            sqlx::query("INSERT INTO poll_options (poll_id, text) VALUES ($1, $2)")
                .bind(poll_id)
                .bind(text)
                .execute(&db)
                .await?;
        }

        count += 1;
        println!("✓ Loaded: {title}");
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Successfully loaded {count} new polls!");
    if skipped > 0 {
        println!("⊘ Skipped {skipped} lines");
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    Ok(())
}
