use sqlx::Row;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::migrate::MigrationType;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use flight_incidents::authz::Role;
use flight_incidents::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "flight-incidents admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Revert the last applied migration using its down script
    MigrateRollback,
    /// Create a user directly, e.g. to bootstrap the first admin
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "crew")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // fall back to the crate-local `.env` when run from another directory
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            let applied = applied_versions(&pool).await?;
            let reversible: HashSet<i64> = migrator
                .iter()
                .filter(|migration| migration.migration_type == MigrationType::ReversibleDown)
                .map(|migration| migration.version)
                .collect();

            match plan_rollback(&applied, &reversible) {
                Rollback::NothingApplied => println!("No applied migrations to roll back"),
                Rollback::Irreversible(version) => {
                    println!("Migration {version} has no down script; nothing was rolled back")
                }
                Rollback::Undo { version, target } => {
                    migrator
                        .undo(&pool, target)
                        .await
                        .with_context(|| format!("failed to roll back migration {version}"))?;
                    println!("Rolled back migration {version}");
                }
            }
        }
        Commands::CreateUser { email, password, role } => {
            let pool = get_pool().await?;
            let id = create_user(&pool, &email, &password, &role).await?;
            println!("Created {} user {} ({})", role, email, id);
        }
    }

    Ok(())
}

async fn create_user(pool: &SqlitePool, email: &str, password: &str, role: &str) -> anyhow::Result<Uuid> {
    let role: Role = role.parse()?;
    let email = email.trim().to_lowercase();
    let password_hash = hash_password(password)?;
    let now = Utc::now();
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("failed to create user {email}"))?;

    Ok(id)
}

#[derive(Debug, PartialEq, Eq)]
enum Rollback {
    NothingApplied,
    Irreversible(i64),
    /// Revert `version` by undoing everything newer than `target`.
    Undo { version: i64, target: i64 },
}

fn plan_rollback(applied: &HashSet<i64>, reversible: &HashSet<i64>) -> Rollback {
    let Some(&version) = applied.iter().max() else {
        return Rollback::NothingApplied;
    };
    if !reversible.contains(&version) {
        return Rollback::Irreversible(version);
    }

    let target = applied.iter().copied().filter(|v| *v < version).max().unwrap_or(0);
    Rollback::Undo { version, target }
}

/// Writes an `.up.sql`/`.down.sql` pair and returns the up script's path.
fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let stem = format!("{}_{}", timestamp, sanitize_name(name));
    let up = Path::new("migrations").join(format!("{stem}.up.sql"));
    let down = Path::new("migrations").join(format!("{stem}.down.sql"));

    if up.exists() || down.exists() {
        anyhow::bail!("migration already exists: {}", up.display());
    }

    fs::write(&up, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", up.display()))?;
    fs::write(&down, "-- Revert the up migration here\n")
        .with_context(|| format!("failed to create migration at {}", down.display()))?;

    Ok(up)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<HashSet<i64>> {
    let has_table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;

    if has_table.is_none() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect())
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let applied_versions = applied_versions(pool).await?;

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter().filter(|m| m.migration_type != MigrationType::ReversibleDown) {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate-local folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_names_are_sanitized() {
        assert_eq!(sanitize_name("Add Incident-Index"), "add_incident_index");
    }

    fn set(versions: &[i64]) -> HashSet<i64> {
        versions.iter().copied().collect()
    }

    #[test]
    fn rollback_reverts_only_the_latest_migration() {
        let plan = plan_rollback(&set(&[1, 5, 9]), &set(&[5, 9]));
        assert_eq!(plan, Rollback::Undo { version: 9, target: 5 });

        let plan = plan_rollback(&set(&[20250101000000]), &set(&[20250101000000]));
        assert_eq!(plan, Rollback::Undo { version: 20250101000000, target: 0 });
    }

    #[test]
    fn rollback_reports_when_nothing_can_be_reverted() {
        assert_eq!(plan_rollback(&set(&[]), &set(&[1])), Rollback::NothingApplied);
        assert_eq!(plan_rollback(&set(&[1, 2]), &set(&[1])), Rollback::Irreversible(2));
    }
}
