//! engine::exec
//!
//! The single command executor.
//!
//! Maps a [`ParsedCommand`] onto repository transitions and queries. This is
//! the only place in the engine that mutates a [`Repository`]; the session
//! driver never calls transitions directly.
//!
//! # Contract
//!
//! - A mutating command runs exactly one repository transition
//! - A failed transition leaves the repository untouched and is returned as
//!   `CommandError::Repo`
//! - A merge that stops on conflicts is a success carrying `conflict`

use super::command::{AddTarget, CommandError, ParsedCommand, Redirect};
use crate::core::repo::snapshot::{RemoteSnapshot, RepoSnapshot};
use crate::core::repo::{Head, Outcome, RepoError, Repository, Transition};
use crate::core::types::{BranchName, FilePath};

/// Result of running one command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Terminal output
    pub lines: Vec<String>,
    /// State after the command, present when the command mutated it
    pub snapshot: Option<RepoSnapshot>,
    /// Paths left in conflict by a merge, with the branch being merged
    pub conflict: Option<(BranchName, Vec<FilePath>)>,
}

impl CommandOutcome {
    fn read(lines: Vec<String>) -> Self {
        Self {
            lines,
            snapshot: None,
            conflict: None,
        }
    }

    fn applied(transition: Transition) -> Self {
        let conflict = match &transition.outcome {
            Outcome::MergeConflict { branch, paths } => Some((branch.clone(), paths.clone())),
            _ => None,
        };
        Self {
            lines: transition.outcome.lines(),
            snapshot: Some(transition.snapshot),
            conflict,
        }
    }

    /// Whether the command changed repository state.
    pub fn mutated(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Run `command` against `repo`.
///
/// `remote` is what `git clone` copies.
pub fn execute(
    command: &ParsedCommand,
    repo: &mut Repository,
    remote: &RemoteSnapshot,
) -> Result<CommandOutcome, CommandError> {
    tracing::debug!(?command, "executing");

    let transition = match command {
        ParsedCommand::Init => repo.init_repo()?,
        ParsedCommand::Add(AddTarget::All) => repo.stage_all()?,
        ParsedCommand::Add(AddTarget::Paths(paths)) => repo.stage_files(paths)?,
        ParsedCommand::Commit { message, all } => repo.commit_with(message, *all)?,
        ParsedCommand::CreateBranch { name, start } => {
            repo.create_branch(name, start.as_deref())?
        }
        ParsedCommand::DeleteBranch { name, force } => repo.delete_branch(name, *force)?,
        ParsedCommand::Checkout(target) => repo.checkout(target)?,
        ParsedCommand::CheckoutNew { name, start } => {
            repo.create_and_switch(name, start.as_deref())?
        }
        ParsedCommand::Switch(name) => repo.switch_branch(name)?,
        ParsedCommand::Merge(name) => repo.merge_branch(name)?,
        ParsedCommand::MergeAbort => repo.abort_merge()?,
        ParsedCommand::Clone { url } => repo.clone_from(url, remote)?,
        ParsedCommand::CreateTag { name, target } => repo.tag(name, target.as_deref())?,
        ParsedCommand::DeleteTag(name) => repo.delete_tag(name)?,
        ParsedCommand::Unstage(paths) => repo.unstage_files(paths)?,
        ParsedCommand::Remove(paths) => repo.remove_files(paths)?,
        ParsedCommand::Echo {
            text,
            redirect: Some((mode, path)),
        } => {
            let line = format!("{text}\n");
            match mode {
                Redirect::Write => repo.write_file(path, &line)?,
                Redirect::Append => repo.append_file(path, &line)?,
            }
        }

        ParsedCommand::Echo {
            text,
            redirect: None,
        } => return Ok(CommandOutcome::read(vec![text.clone()])),
        ParsedCommand::Status => {
            require_repo(repo)?;
            return Ok(CommandOutcome::read(repo.status().lines()));
        }
        ParsedCommand::ListBranches => return Ok(CommandOutcome::read(list_branches(repo)?)),
        ParsedCommand::ListTags => {
            require_repo(repo)?;
            let lines = repo.tags().map(|t| t.name.to_string()).collect();
            return Ok(CommandOutcome::read(lines));
        }
        ParsedCommand::Log { oneline } => return Ok(CommandOutcome::read(log(repo, *oneline)?)),
        ParsedCommand::List { all } => return Ok(CommandOutcome::read(list_files(repo, *all))),
        ParsedCommand::Cat(path) => {
            let content = repo
                .read_file(path)
                .ok_or_else(|| RepoError::PathNotFound(path.clone()))?;
            return Ok(CommandOutcome::read(
                content.lines().map(str::to_string).collect(),
            ));
        }
    };

    Ok(CommandOutcome::applied(transition))
}

fn require_repo(repo: &Repository) -> Result<(), RepoError> {
    if repo.is_initialized() {
        Ok(())
    } else {
        Err(RepoError::NotARepository)
    }
}

fn list_branches(repo: &Repository) -> Result<Vec<String>, RepoError> {
    require_repo(repo)?;
    let mut lines = Vec::new();
    if let Head::Detached(id) = repo.head() {
        let short = repo
            .find_commit(id)
            .map(|c| c.short_hash().to_string())
            .unwrap_or_default();
        lines.push(format!("* (HEAD detached at {short})"));
    }
    let current = match repo.head() {
        Head::Branch(name) => Some(name),
        _ => None,
    };
    for branch in repo.branches() {
        let marker = if Some(&branch.name) == current { '*' } else { ' ' };
        lines.push(format!("{marker} {}", branch.name));
    }
    Ok(lines)
}

fn log(repo: &Repository, oneline: bool) -> Result<Vec<String>, RepoError> {
    require_repo(repo)?;
    let commits = repo.log();
    if commits.is_empty() {
        return Err(RepoError::NoCommits(
            repo.current_branch()
                .cloned()
                .unwrap_or_else(BranchName::main),
        ));
    }

    let snapshot = repo.snapshot();
    let decorations = snapshot.decorations();
    let mut lines = Vec::new();
    for commit in commits {
        let refs = decorations
            .get(&commit.id)
            .map(|labels| format!(" ({})", labels.join(", ")))
            .unwrap_or_default();

        if oneline {
            lines.push(format!("{}{refs} {}", commit.short_hash(), commit.summary()));
            continue;
        }

        lines.push(format!("commit {}{refs}", commit.hash));
        if commit.is_merge() {
            let parents: Vec<String> = commit
                .parents
                .iter()
                .filter_map(|id| repo.find_commit(id))
                .map(|p| p.short_hash().to_string())
                .collect();
            lines.push(format!("Merge: {}", parents.join(" ")));
        }
        lines.push(format!("Date:   {}", commit.created_at));
        lines.push(String::new());
        lines.extend(commit.message.lines().map(|l| format!("    {l}")));
        lines.push(String::new());
    }
    if !oneline {
        lines.pop();
    }
    Ok(lines)
}

fn list_files(repo: &Repository, all: bool) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    if all && repo.is_initialized() {
        names.push(".git".to_string());
    }
    names.extend(repo.files().map(|(path, _)| path.to_string()));
    if names.is_empty() {
        vec![]
    } else {
        vec![names.join("  ")]
    }
}
