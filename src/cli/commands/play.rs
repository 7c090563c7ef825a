//! play and practice commands - Interactive sessions
//!
//! Both commands run the same line-oriented loop over a [`Session`]. Input
//! comes from the terminal or, with `--script`, from a file: one command per
//! line, blank lines and `#` comments skipped.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::core::repo::Head;
use crate::core::ErrorKind;
use crate::engine::bus::{Event, Topic};
use crate::engine::scenario::ScenarioCatalog;
use crate::engine::session::{Session, StepStatus};
use crate::engine::Context;
use crate::ui::graph;
use crate::ui::output::{self, Verbosity};

/// Work through a scenario.
///
/// With a script, running out of lines before the last step is done is an
/// error.
pub fn play(ctx: &Context, scenario: &str, script: Option<&Path>) -> Result<()> {
    let catalog = ScenarioCatalog::load(ctx.scenarios_path())?;
    let scenario = catalog.get(scenario)?.clone();
    let title = scenario.title.clone();
    let session = Session::start(ctx.session_context(), scenario)
        .context("Failed to prepare the first step")?;

    let mut repl = Repl::new(session, ctx);
    repl.print(format!("== {title} =="));
    repl.announce_step();
    repl.run(script)?;

    if script.is_some() && !repl.session.is_complete() {
        let (done, total) = repl.session.progress().unwrap_or_default();
        bail!("script ended with {done} of {total} steps completed");
    }
    Ok(())
}

/// Free practice without a whitelist.
pub fn practice(ctx: &Context, script: Option<&Path>) -> Result<()> {
    let session = Session::practice(ctx.session_context());
    let mut repl = Repl::new(session, ctx);
    repl.print("Practice mode: every command is allowed. Type :quit to leave.");
    repl.run(script)
}

enum Control {
    Continue,
    Quit,
}

struct Repl {
    session: Session,
    verbosity: Verbosity,
}

impl Repl {
    fn new(session: Session, ctx: &Context) -> Self {
        let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);

        session.bus().subscribe(Topic::MergeConflict, |event| {
            if let Event::MergeConflict { branch, paths } = event {
                output::rejection(
                    ErrorKind::MergeConflict,
                    &output::format_conflict(branch, paths),
                );
            }
            Ok(())
        });
        if ctx.show_graph() {
            session.bus().subscribe(Topic::StateChanged, move |event| {
                if let Event::StateChanged { snapshot, .. } = event {
                    output::print(graph::render(snapshot).join("\n"), verbosity);
                }
                Ok(())
            });
        }

        Self { session, verbosity }
    }

    fn print(&self, message: impl std::fmt::Display) {
        output::print(message, self.verbosity);
    }

    fn run(&mut self, script: Option<&Path>) -> Result<()> {
        match script {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read script '{}'", path.display()))?;
                for line in text.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    self.print(format!("$ {line}"));
                    if let Control::Quit = self.handle(line) {
                        break;
                    }
                }
            }
            None => {
                let stdin = io::stdin();
                let interactive = stdin.is_terminal();
                let mut lines = stdin.lock().lines();
                loop {
                    if interactive {
                        print!("{}", self.prompt());
                        io::stdout().flush().context("Failed to write prompt")?;
                    }
                    let Some(line) = lines.next() else {
                        break;
                    };
                    let line = line.context("Failed to read input")?;
                    if let Control::Quit = self.handle(line.trim()) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle(&mut self, line: &str) -> Control {
        if line.is_empty() {
            return Control::Continue;
        }
        if let Some(meta) = line.strip_prefix(':') {
            return self.meta(meta.trim());
        }

        match self.session.submit(line) {
            Ok(submission) => {
                for out in &submission.lines {
                    self.print(out);
                }
                self.report(submission.status)
            }
            Err(err) => {
                output::rejection(err.kind(), &err.to_string());
                Control::Continue
            }
        }
    }

    fn report(&mut self, status: StepStatus) -> Control {
        match status {
            StepStatus::Unchanged => Control::Continue,
            StepStatus::InProgress { step, unmet } => {
                output::debug(
                    format!("step {step} still waiting on: {}", unmet.join(", ")),
                    self.verbosity,
                );
                Control::Continue
            }
            StepStatus::StepCompleted { step, .. } => {
                output::success(format!("Step {step} complete!"), self.verbosity);
                self.announce_step();
                Control::Continue
            }
            StepStatus::ScenarioCompleted { .. } => {
                let title = self
                    .session
                    .scenario()
                    .map(|s| s.title.clone())
                    .unwrap_or_default();
                output::success(format!("Scenario complete: {title}"), self.verbosity);
                Control::Quit
            }
        }
    }

    fn meta(&mut self, command: &str) -> Control {
        match command {
            "q" | "quit" | "exit" => return Control::Quit,
            "hint" => match self.session.hint() {
                Some(hint) => self.print(format!("hint: {hint}")),
                None => self.print("No hint for this step."),
            },
            "graph" => {
                let rows = graph::render(&self.session.repo().snapshot());
                self.print(rows.join("\n"));
            }
            "status" => {
                if self.session.current_step().is_some() {
                    self.announce_step();
                } else if self.session.is_complete() {
                    self.print("Scenario complete.");
                } else {
                    self.print("Practice mode.");
                }
            }
            "reset" => {
                self.session.reset();
                self.print("Current step restarted.");
            }
            "help" => self.print(
                ":hint  :graph  :status  :reset  :quit\nAnything else is run as a command.",
            ),
            other => output::error(format!("unknown session command ':{other}' (try :help)")),
        }
        Control::Continue
    }

    fn announce_step(&self) {
        let (Some(step), Some((done, total))) =
            (self.session.current_step(), self.session.progress())
        else {
            return;
        };
        self.print(String::new());
        self.print(output::format_step(step, done + 1, total));
        for example in &step.command_examples {
            if example.description.is_empty() {
                self.print(format!("  e.g. {}", example.command));
            } else {
                self.print(format!("  e.g. {}  ({})", example.command, example.description));
            }
        }
        for tip in &step.tips {
            self.print(format!("  tip: {tip}"));
        }
    }

    fn prompt(&self) -> String {
        let repo = self.session.repo();
        if !repo.is_initialized() {
            return "$ ".to_string();
        }
        match repo.head() {
            Head::Unborn(branch) | Head::Branch(branch) => format!("({branch}) $ "),
            Head::Detached(id) => {
                let short = repo.find_commit(id).map(|c| c.short_hash()).unwrap_or("?");
                format!("(detached {short}) $ ")
            }
        }
    }
}
