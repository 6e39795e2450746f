use tracing::info;

use crate::config::{RunMode, RuntimeSettings};
use crate::error::Result;
use crate::history::SqliteLogStore;
use crate::plan::{FilePlanProvider, FixturePlanProvider, PlanProvider};

/// The long-lived handles every front end needs, built once from the run mode
pub struct Collaborators {
    pub plans: Box<dyn PlanProvider>,
    pub history: SqliteLogStore,
}

impl Collaborators {
    pub fn for_mode(settings: &RuntimeSettings) -> Result<Self> {
        let collaborators = match settings.run_mode {
            RunMode::Live => Self {
                plans: Box::new(FilePlanProvider::new(&settings.plans_dir)),
                history: SqliteLogStore::open(&settings.db_path)?,
            },
            RunMode::LocalFixture => Self {
                plans: Box::new(FixturePlanProvider),
                history: SqliteLogStore::in_memory()?,
            },
        };

        info!(
            mode = %settings.run_mode,
            plans_dir = %settings.plans_dir.display(),
            db = ?collaborators.history.path(),
            "collaborators ready"
        );
        Ok(collaborators)
    }
}
