use bulletin::{
    domain::{Collection, ContentPayload, CreateAdminRequest},
    repository::{AdminRepository, ContentRepository, SqliteAdminRepository, SqliteContentRepository},
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;

#[derive(Parser)]
#[command(name = "seed", about = "Set up a bulletin board database")]
struct Cli {
    /// SQLite URL; falls back to DATABASE_URL, then the default database file.
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an admin console account.
    Admin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Reset an existing admin's password.
    Password {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Insert demo announcements and events around the current time.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let database_url = cli.database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://bulletin.db?mode=rwc".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    match cli.command {
        Command::Admin { email, password } => {
            let admin_repo = SqliteAdminRepository::new(db_pool.clone());
            let admin = admin_repo.create(CreateAdminRequest { email, password }).await?;
            println!("  ✅ Created admin {}", admin.email);
        }
        Command::Password { email, password } => {
            let admin_repo = SqliteAdminRepository::new(db_pool.clone());
            let admin = admin_repo
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no admin with email {}", email))?;
            admin_repo.set_password(admin.id, &password).await?;
            println!("  ✅ Password updated for {}", admin.email);
        }
        Command::Demo => seed_demo(&db_pool).await?,
    }

    println!("🎉 Done");
    Ok(())
}

async fn seed_demo(db_pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let repo = SqliteContentRepository::new(db_pool.clone());
    let now = Utc::now();

    let demo = [
        (
            Collection::Announcements,
            "Enrollment for second semester",
            "Online enrollment is open at the registrar's portal until Friday.",
            now - Duration::days(2),
            now + Duration::days(5),
        ),
        (
            Collection::Announcements,
            "Library hours extended",
            "The main library stays open until 9 PM during exam week.",
            now - Duration::hours(6),
            now + Duration::days(7),
        ),
        (
            Collection::Announcements,
            "Water interruption",
            "Scheduled maintenance on the science building lines next week.",
            now + Duration::days(3),
            now + Duration::days(4),
        ),
        (
            Collection::Events,
            "Intramurals opening parade",
            "Assemble at the oval by 7:00 AM in department colors.",
            now - Duration::hours(1),
            now + Duration::hours(4),
        ),
        (
            Collection::Events,
            "Research colloquium",
            "Graduate students present at the AVR, Room 204.",
            now + Duration::hours(2),
            now + Duration::hours(5),
        ),
        (
            Collection::Events,
            "Blood drive",
            "Red Cross volunteers at the gym lobby.",
            now - Duration::days(3),
            now - Duration::days(2),
        ),
    ];

    println!("📢 Creating demo content...");
    for (collection, title, content, start_date, end_date) in demo {
        let record = repo
            .create(
                collection,
                ContentPayload {
                    title: title.to_string(),
                    content: content.to_string(),
                    start_date,
                    end_date,
                    updated_at: now,
                },
            )
            .await?;
        println!("  ✅ {} {}", collection.singular(), record.title);
    }

    Ok(())
}
