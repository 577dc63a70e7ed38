use anyhow::Result;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn create_conn(database_url: &str) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder().build(manager)
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
    Ok(())
}

/// Rough token estimate used to keep model inputs inside their context
/// window. Four characters per token is close enough for chunking.
pub fn estimate_token_count(text: &str) -> usize {
    let char_count = text.chars().count();
    (char_count / 4).max(1)
}

#[cfg(test)]
pub mod test_utils {
    use super::*;

    /// Pool over a single in-memory SQLite connection with migrations applied.
    /// `max_size(1)` keeps every checkout on the same database.
    pub fn test_pool() -> DbPool {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("in-memory pool");
        run_migrations(&pool).expect("migrations");
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_quarter_of_chars() {
        assert_eq!(estimate_token_count("abcdefgh"), 2);
    }

    #[test]
    fn token_estimate_never_zero() {
        assert_eq!(estimate_token_count(""), 1);
        assert_eq!(estimate_token_count("a"), 1);
    }
}
