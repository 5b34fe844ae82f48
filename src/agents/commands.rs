//! Optional commands a front-end can attach to a question.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    pub id: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
    Command {
        id: "analyze",
        description: "Analyze current situation",
    },
    Command {
        id: "recommend",
        description: "Get recommendations",
    },
    Command {
        id: "forecast",
        description: "Generate forecasts",
    },
    Command {
        id: "report",
        description: "Generate report",
    },
    Command {
        id: "simulate",
        description: "Run simulation",
    },
    Command {
        id: "optimize",
        description: "Optimize strategy",
    },
];

/// Look up a command by id (case-insensitive).
pub fn find_command(id: &str) -> Option<&'static Command> {
    let id = id.trim();
    COMMANDS.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Build the user message for `question` under an optional command.
///
/// `None`, blank and `auto` leave the question untouched. Unknown commands
/// are ignored.
pub fn apply_command(command: Option<&str>, question: &str) -> String {
    let Some(raw) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        return question.to_string();
    };
    if raw.eq_ignore_ascii_case("auto") {
        return question.to_string();
    }
    match find_command(raw) {
        Some(command) => format!("Command: {}\n\n{}", command.description, question),
        None => {
            tracing::warn!("Ignoring unknown command '{}'", raw);
            question.to_string()
        }
    }
}
