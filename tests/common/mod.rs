use std::sync::Arc;

use superfund_core::db::{self, DbPool};

/// A migrated SQLite database in a temp directory, dropped with the test.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    _dir: tempfile::TempDir,
}

pub fn setup_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let db_path = db::init(dir.path().to_str().expect("temp path is valid UTF-8"))
        .expect("Failed to initialize database");
    let pool = db::create_pool(&db_path).expect("Failed to create database pool");
    db::run_migrations(&pool).expect("Failed to run migrations");

    TestDb {
        pool,
        _dir: dir,
    }
}
