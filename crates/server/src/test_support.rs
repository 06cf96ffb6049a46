use std::sync::{Mutex, MutexGuard, OnceLock};

use ::test_support::TempDir;

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Serializes tests that touch process environment variables and points the
/// deployment at a throwaway database.
pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    _temp_dir: TempDir,
    prev_database_url: Option<String>,
    prev_jwt_secret: Option<String>,
}

impl TestEnvGuard {
    pub fn new() -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let temp_dir = ::test_support::temp_dir("kanri-server-test");

        let prev_database_url = std::env::var("DATABASE_URL").ok();
        let prev_jwt_secret = std::env::var("KANRI_JWT_SECRET").ok();

        let db_path = temp_dir.path().join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());

        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            std::env::set_var("DATABASE_URL", db_url);
            std::env::set_var("KANRI_JWT_SECRET", "test-secret");
        }

        Self {
            _lock: lock,
            _temp_dir: temp_dir,
            prev_database_url,
            prev_jwt_secret,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            match &self.prev_database_url {
                Some(value) => std::env::set_var("DATABASE_URL", value),
                None => std::env::remove_var("DATABASE_URL"),
            }
            match &self.prev_jwt_secret {
                Some(value) => std::env::set_var("KANRI_JWT_SECRET", value),
                None => std::env::remove_var("KANRI_JWT_SECRET"),
            }
        }
    }
}
