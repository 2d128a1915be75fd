//! Print ledger explanations to the terminal, either for a single node or for
//! its whole dependency closure.

use crate::errors::CausalError;
use crate::provenance::result::{Provenance, nested_dependencies};
use crate::provenance::step::{LogEntry, Step};

use std::io::Write;
use std::sync::Arc;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// How much of the ledger to print.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExplainOptions {
    /// Only the node itself.
    Single,
    /// The node and everything it transitively consumed, leaves first.
    Nested,
}

/// Print a colored explanation of a ledger node to stdout. Step names are
/// printed in cyan, assumptions in yellow, derived values in green, and the
/// rest in the default color.
pub fn print_explanation(
    node: &Arc<Provenance>,
    options: ExplainOptions,
) -> Result<(), CausalError> {
    let nodes = match options {
        ExplainOptions::Single => vec![Arc::clone(node)],
        ExplainOptions::Nested => nested_dependencies(node)?,
    };

    let mut stdout = StandardStream::stdout(ColorChoice::Always);
    for node in nodes {
        if print_step_colored(&mut stdout, &node.step, 0).is_err() {
            // terminal went away, nothing sensible left to do
            break;
        }
    }
    let _ = stdout.reset();
    Ok(())
}

fn print_step_colored(
    stdout: &mut StandardStream,
    step: &Step,
    depth: usize,
) -> std::io::Result<()> {
    let pad = "\t".repeat(depth);
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    writeln!(stdout, "{pad}{}", step.name)?;
    stdout.reset()?;

    let pad = "\t".repeat(depth + 1);
    for entry in &step.log {
        match entry {
            LogEntry::Note(text) => {
                writeln!(stdout, "{pad}{text}")?;
            }
            LogEntry::Assumed(assumption) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
                writeln!(stdout, "{pad}{assumption}")?;
                stdout.reset()?;
            }
            LogEntry::Derived(key, value) => {
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(stdout, "{pad}Derived: {key} = {value}")?;
                stdout.reset()?;
            }
            LogEntry::SubStep(sub) => {
                print_step_colored(stdout, sub, depth + 1)?;
            }
        }
    }
    Ok(())
}

/// Plain-text rendering of a node's explanation, including its dependency
/// closure when requested. Used where a terminal is not available.
pub fn explanation_string(
    node: &Arc<Provenance>,
    options: ExplainOptions,
) -> Result<String, CausalError> {
    let nodes = match options {
        ExplainOptions::Single => vec![Arc::clone(node)],
        ExplainOptions::Nested => nested_dependencies(node)?,
    };
    let rendered: Vec<String> = nodes.iter().map(|node| node.step.explain()).collect();
    Ok(rendered.join("\n"))
}

#[cfg(test)]
mod tests {
    use crate::provenance::explain::{ExplainOptions, explanation_string};
    use crate::provenance::result::{OpArg, Operation, Provenance};
    use crate::provenance::step::Step;

    use std::sync::Arc;

    #[test]
    /// Test the plain rendering over a small dependency chain.
    fn nested_explanation() {
        let mut leaf_step = Step::new("Data Processing");
        leaf_step.assume("x is on {0, 1}");
        let leaf = Provenance::freeze(Operation::new("data"), leaf_step);

        let mut top_step = Step::new("Estimation");
        top_step.note("brute force evaluation");
        let top = Provenance::freeze(
            Operation::new("estimate").with_arg(OpArg::Result(Arc::clone(&leaf))),
            top_step,
        );

        let single = explanation_string(&top, ExplainOptions::Single).unwrap();
        assert!(single.starts_with("Estimation"));
        assert!(!single.contains("Data Processing"));

        let nested = explanation_string(&top, ExplainOptions::Nested).unwrap();
        let data_at = nested.find("Data Processing").unwrap();
        let estimation_at = nested.find("Estimation").unwrap();
        assert!(data_at < estimation_at);
        assert!(nested.contains("Assume: x is on {0, 1}"));
    }
}
