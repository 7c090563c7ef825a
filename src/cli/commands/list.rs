//! list and show commands - Browse the scenario catalogue

use anyhow::Result;

use crate::engine::scenario::ScenarioCatalog;
use crate::engine::Context;
use crate::ui::output::{self, Verbosity};

/// List available scenarios.
///
/// In quiet mode only the ids are printed, one per line.
pub fn list(ctx: &Context) -> Result<()> {
    let catalog = ScenarioCatalog::load(ctx.scenarios_path())?;

    if ctx.quiet {
        for scenario in catalog.scenarios() {
            println!("{}", scenario.id);
        }
        return Ok(());
    }

    let width = catalog
        .scenarios()
        .iter()
        .map(|s| s.id.len())
        .max()
        .unwrap_or(0);
    for scenario in catalog.scenarios() {
        println!(
            "{:<width$}  {} ({} steps)",
            scenario.id,
            scenario.title,
            scenario.steps.len()
        );
    }
    Ok(())
}

/// Show the steps of one scenario.
pub fn show(ctx: &Context, id: &str) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let catalog = ScenarioCatalog::load(ctx.scenarios_path())?;
    let scenario = catalog.get(id)?;

    output::print(&scenario.title, verbosity);
    if !scenario.description.is_empty() {
        output::print(&scenario.description, verbosity);
    }

    let total = scenario.steps.len();
    for (i, step) in scenario.steps.iter().enumerate() {
        output::print("", verbosity);
        output::print(output::format_step(step, i + 1, total), verbosity);
        if !step.hint.is_empty() {
            output::print(format!("Hint: {}", step.hint), verbosity);
        }
        if !step.command_examples.is_empty() {
            let commands: Vec<&str> = step
                .command_examples
                .iter()
                .map(|e| e.command.as_str())
                .collect();
            output::print(output::format_list(&commands, "  $ "), verbosity);
        }
    }
    Ok(())
}
