//! Slash commands accepted in the input box.

/// Supported slash commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Select follow-up option N (1-based) of the latest bot turn.
    Option(usize),
    /// Select entity N (1-based) of the latest entity list.
    Entity(usize),
    /// Replace the actor id; `None` clears it.
    Actor(Option<String>),
    Open,
    Close,
    Export,
    Help,
}

/// Parse a slash command from the input line.
///
/// Returns `Ok(None)` for input that is not a command.
pub fn parse_slash_command(input: &str) -> Result<Option<SlashCommand>, String> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(None);
    }
    let mut parts = trimmed.trim_start_matches('/').split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(None);
    };
    if let Ok(index) = command.parse::<usize>() {
        return position(index).map(|index| Some(SlashCommand::Option(index)));
    }
    match command.to_lowercase().as_str() {
        "e" | "entity" => {
            let Some(index) = parts.next() else {
                return Err("usage: /e <number>".to_string());
            };
            let index = index
                .parse::<usize>()
                .map_err(|_| format!("invalid entity number: {index}"))?;
            position(index).map(|index| Some(SlashCommand::Entity(index)))
        }
        "actor" => Ok(Some(SlashCommand::Actor(parts.next().map(str::to_string)))),
        "open" => Ok(Some(SlashCommand::Open)),
        "close" => Ok(Some(SlashCommand::Close)),
        "export" => Ok(Some(SlashCommand::Export)),
        "help" => Ok(Some(SlashCommand::Help)),
        _ => Err(format!("unknown command: {command}")),
    }
}

/// One-line summary of the commands.
pub const HELP_TEXT: &str =
    "/N option  /e N entity  /actor ID  /open  /close  /export  (plain text is sent as-is)";

fn position(index: usize) -> Result<usize, String> {
    if index == 0 {
        return Err("numbering starts at 1".to_string());
    }
    Ok(index)
}
