//! engine::session
//!
//! The session driver: one learner, one simulated repository, and optionally
//! one scenario in progress.
//!
//! # Lifecycle of a submitted line
//!
//! ```text
//! tokenize -> gate (step whitelist) -> parse -> execute
//!          -> state-changed [-> merge-conflict]
//!          -> evaluate step -> step-progress | step-completed [-> scenario-completed]
//! ```
//!
//! Any error along the way publishes `command-rejected` and leaves the
//! repository as it was. Read-only commands never trigger evaluation.
//!
//! # Steps and state
//!
//! When a step with an initial state begins, the repository is rebuilt from
//! that seed. Otherwise the learner keeps working on the repository they
//! have. Either way the state at the start of the step is the checkpoint
//! that [`Session::reset`] returns to.

use super::bus::{Event, EventBus, PublishReport};
use super::command::{self, CommandError};
use super::exec::{self, CommandOutcome};
use super::gate::{self, Whitelist};
use super::predicate::state_view;
use super::scenario::{Scenario, ScenarioRunner, Step};
use crate::core::context::SessionContext;
use crate::core::repo::snapshot::{RemoteSnapshot, RepoSeed, RepoSnapshot};
use crate::core::repo::{RepoError, Repository};
use crate::core::types::{BranchName, FilePath};

/// Where the scenario stands after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// No evaluation happened (read-only command, free practice, or a
    /// finished scenario).
    Unchanged,
    InProgress { step: u32, unmet: Vec<String> },
    /// `next` is the step now active.
    StepCompleted { step: u32, next: u32 },
    /// The last step was completed.
    ScenarioCompleted { step: u32 },
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub lines: Vec<String>,
    pub mutated: bool,
    pub conflict: Option<(BranchName, Vec<FilePath>)>,
    pub status: StepStatus,
}

/// A tutoring session.
#[derive(Debug)]
pub struct Session {
    ctx: SessionContext,
    repo: Repository,
    runner: Option<ScenarioRunner>,
    whitelist: Option<Whitelist>,
    remote: RemoteSnapshot,
    checkpoint: Repository,
    bus: EventBus,
}

impl Session {
    /// Free practice: an empty repository and no whitelist.
    pub fn practice(ctx: SessionContext) -> Self {
        let repo = Repository::new(&ctx);
        tracing::debug!(session = %ctx.id, "practice session started");
        Self {
            remote: ctx.remote.clone(),
            checkpoint: repo.clone(),
            repo,
            runner: None,
            whitelist: None,
            bus: EventBus::new(),
            ctx,
        }
    }

    /// Start `scenario` at its first step.
    ///
    /// # Errors
    ///
    /// Fails if the first step's initial state cannot be built.
    pub fn start(ctx: SessionContext, scenario: Scenario) -> Result<Self, RepoError> {
        let runner = ScenarioRunner::new(&ctx, scenario);
        let (repo, remote) = match runner.current_step().and_then(|s| s.initial_state.as_ref()) {
            Some(seed) => (Repository::from_seed(&ctx, seed)?, remote_for(&ctx, seed)),
            None => (Repository::new(&ctx), ctx.remote.clone()),
        };
        let whitelist = runner.current_step().map(Step::whitelist);

        Ok(Self {
            checkpoint: repo.clone(),
            repo,
            runner: Some(runner),
            whitelist,
            remote,
            bus: EventBus::new(),
            ctx,
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// The bus events are published on. Subscribe before submitting.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.runner.as_ref().map(ScenarioRunner::scenario)
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.runner.as_ref().and_then(ScenarioRunner::current_step)
    }

    /// Completed and total steps, if a scenario is running.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.runner.as_ref().map(ScenarioRunner::progress)
    }

    pub fn is_complete(&self) -> bool {
        self.runner.as_ref().is_some_and(ScenarioRunner::is_complete)
    }

    pub fn hint(&self) -> Option<&str> {
        self.current_step()
            .map(|s| s.hint.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Run one command line.
    ///
    /// # Example
    ///
    /// ```
    /// use gitcoach::core::context::SessionContext;
    /// use gitcoach::engine::session::Session;
    ///
    /// let mut session = Session::practice(SessionContext::default());
    /// session.submit("git init").unwrap();
    /// session.submit("echo hello > a.txt").unwrap();
    /// session.submit("git add a.txt").unwrap();
    /// let out = session.submit("git commit -m 'First'").unwrap();
    /// assert!(out.mutated);
    /// assert_eq!(session.repo().commits().len(), 1);
    /// ```
    pub fn submit(&mut self, line: &str) -> Result<Submission, CommandError> {
        match self.run(line) {
            Ok(submission) => Ok(submission),
            Err(err) => {
                tracing::debug!(session = %self.ctx.id, command = line, error = %err, "command rejected");
                self.publish(Event::CommandRejected {
                    command: line.trim().to_string(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Restore the state the current step started from.
    pub fn reset(&mut self) -> RepoSnapshot {
        self.repo = self.checkpoint.clone();
        let snapshot = self.repo.snapshot();
        self.publish(Event::StateChanged {
            command: None,
            snapshot: Box::new(snapshot.clone()),
        });
        snapshot
    }

    fn run(&mut self, line: &str) -> Result<Submission, CommandError> {
        let tokens = command::tokenize(line)?;
        if tokens.is_empty() {
            return Err(CommandError::Empty);
        }
        gate::gate(self.whitelist.as_ref(), &tokens)?;
        let parsed = command::parse(&tokens)?;
        let CommandOutcome {
            lines,
            snapshot,
            conflict,
        } = exec::execute(&parsed, &mut self.repo, &self.remote)?;

        let Some(snapshot) = snapshot else {
            return Ok(Submission {
                lines,
                mutated: false,
                conflict,
                status: StepStatus::Unchanged,
            });
        };

        self.publish(Event::StateChanged {
            command: Some(line.trim().to_string()),
            snapshot: Box::new(snapshot.clone()),
        });
        if let Some((branch, paths)) = &conflict {
            self.publish(Event::MergeConflict {
                branch: branch.clone(),
                paths: paths.clone(),
            });
        }

        let status = self.evaluate(&snapshot);
        Ok(Submission {
            lines,
            mutated: true,
            conflict,
            status,
        })
    }

    /// Check the current step against `snapshot`, advancing as long as
    /// steps are already met.
    ///
    /// A step whose goal already holds on entry completes at once.
    fn evaluate(&mut self, snapshot: &RepoSnapshot) -> StepStatus {
        let mut view = state_view(snapshot);
        let mut status = StepStatus::Unchanged;
        loop {
            let Some(runner) = self.runner.as_mut() else {
                return status;
            };
            let Some(step) = runner.current_step() else {
                return status;
            };
            let step_id = step.id;
            let scenario = runner.scenario().id.clone();

            let evaluation = runner.evaluate(&view);
            if !evaluation.is_satisfied() {
                if status != StepStatus::Unchanged {
                    return status;
                }
                self.publish(Event::StepProgress {
                    scenario,
                    step: step_id,
                    unmet: evaluation.unmet.clone(),
                });
                return StepStatus::InProgress {
                    step: step_id,
                    unmet: evaluation.unmet,
                };
            }

            let next = runner
                .advance()
                .map(|s| (s.id, s.whitelist(), s.initial_state.clone()));
            self.publish(Event::StepCompleted {
                scenario: scenario.clone(),
                step: step_id,
            });

            let Some((next_id, whitelist, seed)) = next else {
                self.whitelist = None;
                self.publish(Event::ScenarioCompleted { scenario });
                return StepStatus::ScenarioCompleted { step: step_id };
            };
            self.whitelist = Some(whitelist);
            self.enter_step(seed.as_ref());
            status = StepStatus::StepCompleted {
                step: step_id,
                next: next_id,
            };
            view = state_view(&self.repo.snapshot());
        }
    }

    fn enter_step(&mut self, seed: Option<&RepoSeed>) {
        if let Some(seed) = seed {
            match Repository::from_seed(&self.ctx, seed) {
                Ok(repo) => {
                    self.repo = repo;
                    self.remote = remote_for(&self.ctx, seed);
                    self.publish(Event::StateChanged {
                        command: None,
                        snapshot: Box::new(self.repo.snapshot()),
                    });
                }
                Err(err) => {
                    tracing::warn!(session = %self.ctx.id, error = %err, "could not seed step, keeping current state");
                }
            }
        }
        self.checkpoint = self.repo.clone();
    }

    fn publish(&self, event: Event) -> PublishReport {
        self.bus.publish(&event)
    }
}

fn remote_for(ctx: &SessionContext, seed: &RepoSeed) -> RemoteSnapshot {
    seed.remote.clone().unwrap_or_else(|| ctx.remote.clone())
}
