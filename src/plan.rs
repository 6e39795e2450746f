use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static FIXTURE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/plans");

/// One prescribed set: the target the athlete is asked to hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrescribedSet {
    pub reps: u32,
    #[serde(alias = "weight")]
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescribedExercise {
    pub name: String,
    pub sets: Vec<PrescribedSet>,
}

/// An authored workout prescription. Immutable while a session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub exercises: Vec<PrescribedExercise>,
}

impl Plan {
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Supplies plans to the session runner
pub trait PlanProvider {
    fn load_plan(&self, id: &str) -> Result<Plan>;
    fn list_plans(&self) -> Result<Vec<Plan>>;
}

/// Reads one plan per `*.json` document in a directory
#[derive(Debug, Clone)]
pub struct FilePlanProvider {
    dir: PathBuf,
}

impl FilePlanProvider {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn plan_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl PlanProvider for FilePlanProvider {
    fn load_plan(&self, id: &str) -> Result<Plan> {
        self.list_plans()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))
    }

    fn list_plans(&self) -> Result<Vec<Plan>> {
        let mut plans = Vec::new();
        for path in self.plan_paths()? {
            let bytes = fs::read(&path)?;
            plans.push(parse_plan(&path, &bytes)?);
        }
        plans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(plans)
    }
}

/// Plans compiled into the binary, used when running against local fixtures
#[derive(Debug, Clone, Copy, Default)]
pub struct FixturePlanProvider;

impl PlanProvider for FixturePlanProvider {
    fn load_plan(&self, id: &str) -> Result<Plan> {
        self.list_plans()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))
    }

    fn list_plans(&self) -> Result<Vec<Plan>> {
        let mut plans = FIXTURE_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .map(|f| parse_plan(f.path(), f.contents()))
            .collect::<Result<Vec<_>>>()?;
        plans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(plans)
    }
}

fn parse_plan(path: &Path, bytes: &[u8]) -> Result<Plan> {
    serde_json::from_slice(bytes).map_err(|source| Error::InvalidPlan {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    const LEG_DAY: &str = r#"{
        "id": "leg-day",
        "title": "Leg Day",
        "exercises": [
            { "name": "Squat", "sets": [ { "reps": 10, "load": 60 }, { "reps": 10, "load": 60 } ] }
        ]
    }"#;

    #[test]
    fn weight_is_accepted_as_load_alias() {
        let plan: Plan = serde_json::from_str(
            r#"{ "id": "a", "title": "A", "exercises": [ { "name": "Row", "sets": [ { "reps": 8, "weight": 40.5 } ] } ] }"#,
        )
        .unwrap();
        assert_eq!(plan.exercises[0].sets[0].load, 40.5);
    }

    #[test]
    fn file_provider_loads_by_id() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("legs.json"), LEG_DAY).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a plan").unwrap();

        let provider = FilePlanProvider::new(dir.path());
        let plan = provider.load_plan("leg-day").unwrap();

        assert_eq!(plan.title, "Leg Day");
        assert_eq!(plan.total_sets(), 2);
        assert_eq!(provider.list_plans().unwrap().len(), 1);
    }

    #[test]
    fn file_provider_unknown_id() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("legs.json"), LEG_DAY).unwrap();

        let provider = FilePlanProvider::new(dir.path());
        assert_matches!(provider.load_plan("push"), Err(Error::PlanNotFound(id)) if id == "push");
    }

    #[test]
    fn file_provider_rejects_malformed_documents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ \"id\": 3 }").unwrap();

        let provider = FilePlanProvider::new(dir.path());
        assert_matches!(provider.list_plans(), Err(Error::InvalidPlan { .. }));
    }

    #[test]
    fn file_provider_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let provider = FilePlanProvider::new(dir.path().join("nope"));
        assert!(provider.list_plans().unwrap().is_empty());
    }

    #[test]
    fn fixture_plans_parse_and_sort() {
        let plans = FixturePlanProvider.list_plans().unwrap();
        assert!(!plans.is_empty());
        assert!(plans.windows(2).all(|w| w[0].id <= w[1].id));
        assert!(plans.iter().all(|p| !p.exercises.is_empty()));

        let legs = FixturePlanProvider.load_plan("leg-day").unwrap();
        assert_eq!(legs.title, "Leg Day");
    }
}
