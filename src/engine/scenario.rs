//! engine::scenario
//!
//! Scenario definitions, the catalogue that loads them, and the runner that
//! tracks a learner's progress through one scenario.
//!
//! # Catalogue format
//!
//! Scenarios are TOML documents made of `[[scenario]]` tables:
//!
//! ```toml
//! [[scenario]]
//! id = "first-commit"
//! title = "Your first commit"
//! description = "Create a repository and commit a file."
//!
//! [[scenario.steps]]
//! id = 1
//! title = "Initialize"
//! hint = "Run git init"
//! allowed_commands = ["git init", "git status", "ls"]
//! expected_state = { hasGitInit = true }
//! ```
//!
//! The built-in catalogue is embedded in the binary. An extra file may add
//! scenarios but never replace a built-in one.
//!
//! # Validation
//!
//! A catalogue is checked once when it is loaded:
//! - scenario ids are non-empty and unique
//! - every scenario has at least one step, with unique step ids
//! - whitelist entries are non-blank
//! - predicate keys name known state attributes
//! - initial states can actually be built

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::gate::Whitelist;
use super::predicate::{self, Evaluation, ExpectedState};
use crate::core::context::SessionContext;
use crate::core::repo::snapshot::RepoSeed;
use crate::core::repo::Repository;
use crate::core::ErrorKind;

const BUILTIN: &str = include_str!("../../scenarios/builtin.toml");

/// Errors from loading or looking up scenarios.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read scenario file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse scenarios from {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("invalid scenario '{scenario}': {message}")]
    Invalid { scenario: String, message: String },

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::UnknownScenario(_) => ErrorKind::InvalidTarget,
            _ => ErrorKind::InvalidArguments,
        }
    }
}

/// An example command shown to the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandExample {
    pub command: String,
    #[serde(default)]
    pub description: String,
}

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub command_examples: Vec<CommandExample>,
    #[serde(default)]
    pub tips: Vec<String>,
    /// Command prefixes the learner may use.
    pub allowed_commands: Vec<String>,
    /// Attributes that must all match for the step to complete.
    pub expected_state: ExpectedState,
    /// Repository state the step starts from.
    #[serde(default)]
    pub initial_state: Option<RepoSeed>,
}

impl Step {
    pub fn whitelist(&self) -> Whitelist {
        Whitelist::new(&self.allowed_commands)
    }
}

/// An ordered series of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Check the scenario's structure.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::Invalid {
            scenario: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("scenario id is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(invalid("scenario has no steps".into()));
        }

        let mut ids = HashSet::new();
        for step in &self.steps {
            if !ids.insert(step.id) {
                return Err(invalid(format!("duplicate step id {}", step.id)));
            }
            if step.allowed_commands.iter().any(|c| c.trim().is_empty()) {
                return Err(invalid(format!("step {} has a blank allowed command", step.id)));
            }
            if let Some(key) = step
                .expected_state
                .keys()
                .find(|k| !predicate::is_known_key(k))
            {
                return Err(invalid(format!(
                    "step {} expects unknown attribute '{key}'",
                    step.id
                )));
            }
            if let Some(seed) = &step.initial_state {
                Repository::from_seed(&SessionContext::default(), seed).map_err(|e| {
                    invalid(format!("step {} has an unusable initial state: {e}", step.id))
                })?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    scenario: Vec<Scenario>,
}

/// The scenarios available to a session.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// The embedded scenarios.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN, "built-in catalogue")
    }

    /// Parse and validate a catalogue document.
    ///
    /// `origin` names the source in error messages.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(|e| CatalogError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self {
            scenarios: file.scenario,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Built-in scenarios plus those in `extra`, if given.
    pub fn load(extra: Option<&Path>) -> Result<Self, CatalogError> {
        let mut catalog = Self::builtin()?;
        if let Some(path) = extra {
            let text = fs::read_to_string(path).map_err(|e| CatalogError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;
            let added = Self::from_toml(&text, &path.display().to_string())?;
            tracing::debug!(
                path = %path.display(),
                count = added.scenarios.len(),
                "loaded extra scenarios"
            );
            catalog.scenarios.extend(added.scenarios);
            catalog.validate()?;
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Result<&Scenario, CatalogError> {
        self.scenarios
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CatalogError::UnknownScenario(id.to_string()))
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut ids = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !ids.insert(scenario.id.as_str()) {
                return Err(CatalogError::Invalid {
                    scenario: scenario.id.clone(),
                    message: "duplicate scenario id".into(),
                });
            }
        }
        Ok(())
    }
}

/// Progress through one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    session: Uuid,
    scenario: Scenario,
    index: usize,
}

impl ScenarioRunner {
    pub fn new(ctx: &SessionContext, scenario: Scenario) -> Self {
        tracing::debug!(session = %ctx.id, scenario = %scenario.id, "starting scenario");
        Self {
            session: ctx.id,
            scenario,
            index: 0,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// The step being worked on, or `None` once every step is done.
    pub fn current_step(&self) -> Option<&Step> {
        self.scenario.steps.get(self.index)
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.scenario.steps.len()
    }

    /// Number of completed steps and total steps.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.scenario.steps.len();
        (self.index.min(total), total)
    }

    /// Evaluate the current step's predicate against a state view.
    ///
    /// A finished scenario has nothing left to match.
    pub fn evaluate(&self, view: &serde_json::Value) -> Evaluation {
        match self.current_step() {
            Some(step) => predicate::evaluate(&step.expected_state, view),
            None => Evaluation::default(),
        }
    }

    /// Move past the current step and return the next one.
    pub fn advance(&mut self) -> Option<&Step> {
        if let Some(step) = self.current_step() {
            tracing::debug!(
                session = %self.session,
                scenario = %self.scenario.id,
                step = step.id,
                "step completed"
            );
            self.index += 1;
        }
        self.current_step()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
        [[scenario]]
        id = "sample"
        title = "Sample"

        [[scenario.steps]]
        id = 1
        title = "Init"
        allowed_commands = ["git init"]
        expected_state = { hasGitInit = true }

        [[scenario.steps]]
        id = 2
        title = "Commit"
        hint = "Commit something"
        allowed_commands = ["git add", "git commit"]
        expected_state = { hasCommit = true }
        command_examples = [{ command = "git commit -m 'msg'" }]

        [scenario.steps.initial_state]
        initialized = true
        files = { "a.txt" = "a\n" }
    "#;

    mod catalog {
        use super::*;

        #[test]
        fn builtin_catalog_is_valid() {
            let catalog = ScenarioCatalog::builtin().unwrap();
            for id in [
                "personal-dev",
                "team-collaboration",
                "conflict-resolution",
                "tagging-releases",
            ] {
                assert!(catalog.get(id).is_ok(), "{id}");
            }
        }

        #[test]
        fn parses_sample() {
            let catalog = ScenarioCatalog::from_toml(SAMPLE, "sample").unwrap();
            let scenario = catalog.get("sample").unwrap();
            assert_eq!(scenario.steps.len(), 2);
            let step = &scenario.steps[1];
            assert_eq!(step.command_examples[0].description, "");
            let seed = step.initial_state.as_ref().unwrap();
            assert!(seed.initialized);
            assert_eq!(seed.files.len(), 1);
        }

        #[test]
        fn unknown_scenario() {
            let catalog = ScenarioCatalog::from_toml(SAMPLE, "sample").unwrap();
            let err = catalog.get("nope").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTarget);
        }

        #[test]
        fn rejects_unknown_attribute() {
            let text = SAMPLE.replace("hasCommit", "hasRebased");
            let err = ScenarioCatalog::from_toml(&text, "sample").unwrap_err();
            assert!(matches!(err, CatalogError::Invalid { .. }));
        }

        #[test]
        fn rejects_duplicate_step_ids() {
            let text = SAMPLE.replace("id = 2", "id = 1");
            let err = ScenarioCatalog::from_toml(&text, "sample").unwrap_err();
            assert!(err.to_string().contains("duplicate step id"));
        }

        #[test]
        fn rejects_empty_scenario() {
            let text = r#"
                [[scenario]]
                id = "empty"
                title = "Empty"
                steps = []
            "#;
            let err = ScenarioCatalog::from_toml(text, "inline").unwrap_err();
            assert!(err.to_string().contains("no steps"));
        }

        #[test]
        fn rejects_blank_whitelist_entry() {
            let text = SAMPLE.replace(r#"["git init"]"#, r#"["git init", " "]"#);
            assert!(ScenarioCatalog::from_toml(&text, "sample").is_err());
        }

        #[test]
        fn rejects_invalid_branch_in_seed() {
            let text = SAMPLE.replace("initialized = true", "branches = [\"bad..name\"]");
            let err = ScenarioCatalog::from_toml(&text, "sample").unwrap_err();
            assert!(matches!(err, CatalogError::Parse { .. }));
        }

        #[test]
        fn extra_file_adds_scenarios() {
            let temp = tempfile::TempDir::new().unwrap();
            let path = temp.path().join("extra.toml");
            fs::write(&path, SAMPLE).unwrap();

            let catalog = ScenarioCatalog::load(Some(&path)).unwrap();
            assert!(catalog.get("sample").is_ok());
            assert!(catalog.get("personal-dev").is_ok());
        }

        #[test]
        fn extra_file_cannot_shadow_builtin() {
            let temp = tempfile::TempDir::new().unwrap();
            let path = temp.path().join("extra.toml");
            fs::write(&path, SAMPLE.replace("\"sample\"", "\"personal-dev\"")).unwrap();

            let err = ScenarioCatalog::load(Some(&path)).unwrap_err();
            assert!(err.to_string().contains("duplicate scenario id"));
        }

        #[test]
        fn missing_extra_file() {
            let err = ScenarioCatalog::load(Some(Path::new("/nonexistent/x.toml"))).unwrap_err();
            assert!(matches!(err, CatalogError::Read { .. }));
        }
    }

    mod runner {
        use super::*;

        fn runner() -> ScenarioRunner {
            let catalog = ScenarioCatalog::from_toml(SAMPLE, "sample").unwrap();
            ScenarioRunner::new(
                &SessionContext::default(),
                catalog.get("sample").unwrap().clone(),
            )
        }

        #[test]
        fn walks_steps_in_order() {
            let mut runner = runner();
            assert_eq!(runner.current_step().unwrap().id, 1);
            assert_eq!(runner.progress(), (0, 2));

            assert_eq!(runner.advance().unwrap().id, 2);
            assert!(runner.advance().is_none());
            assert!(runner.is_complete());
            assert_eq!(runner.progress(), (2, 2));
            assert!(runner.advance().is_none());
        }

        #[test]
        fn evaluates_current_step() {
            let runner = runner();
            assert!(!runner.evaluate(&json!({"hasGitInit": false})).is_satisfied());
            assert!(runner.evaluate(&json!({"hasGitInit": true})).is_satisfied());
        }
    }
}
