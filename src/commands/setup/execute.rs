use std::error::Error;

use serde::Serialize;

use super::SetupCmd;
use crate::commands::Execute;
use crate::db::Database;

/// Result of the setup command execution
#[derive(Debug, Clone, Serialize)]
pub struct SetupResult {
    pub backend: String,
    pub format: String,
    /// Schema version found before setup ran
    pub previous_version: Option<i64>,
    pub version: i64,
}

impl SetupResult {
    pub fn created_new(&self) -> bool {
        self.previous_version.is_none()
    }
}

impl Execute for SetupCmd {
    type Output = SetupResult;

    fn execute(self, db: &Database) -> Result<Self::Output, Box<dyn Error>> {
        let previous_version = db.schema_version()?;
        let version = db.setup()?;

        Ok(SetupResult {
            backend: db.backend_kind().to_string(),
            format: db.format_name().to_string(),
            previous_version,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_db, BackendConfig, DatabaseConfig};
    use rstest::{fixture, rstest};

    #[fixture]
    fn db() -> Database {
        open_db(DatabaseConfig::new(BackendConfig::Memory)).expect("Failed to open db")
    }

    #[rstest]
    fn test_setup_creates_schema(db: Database) {
        let result = SetupCmd {}.execute(&db).expect("Setup should succeed");
        assert!(result.created_new());
        assert_eq!(result.version, 1);
        assert_eq!(result.format, "json");
        assert_eq!(result.backend, "sqlite");
    }

    #[rstest]
    fn test_setup_twice_reports_existing(db: Database) {
        SetupCmd {}.execute(&db).unwrap();
        let result = SetupCmd {}.execute(&db).unwrap();
        assert!(!result.created_new());
        assert_eq!(result.previous_version, Some(1));
    }

    #[rstest]
    fn test_setup_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idmef.sqlite");
        let db = open_db(DatabaseConfig::new(BackendConfig::Sqlite { path: path.clone() })).unwrap();
        SetupCmd {}.execute(&db).unwrap();
        assert!(path.exists());
    }
}
