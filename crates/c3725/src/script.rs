//! Replay of saved bay configurations.
//!
//! Accepts the output of [`BayManager::save_config`]: `bind <slot> <type>`
//! and `attach <slot> <port> <nio>` lines. Blank lines and `#` comments are
//! skipped.

use crate::error::{RouterError, RouterResult};
use crate::manager::BayManager;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Bind { slot: u32, device_type: &'a str },
    Attach { slot: u32, port: u32, nio: &'a str },
}

fn parse_number(token: Option<&str>, what: &str) -> Result<u32, String> {
    let token = token.ok_or_else(|| format!("missing {}", what))?;
    token
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, token))
}

fn parse_line(line: &str) -> Result<Option<Command<'_>>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line.split_whitespace();
    let command = match tokens.next() {
        Some("bind") => Command::Bind {
            slot: parse_number(tokens.next(), "slot")?,
            device_type: tokens.next().ok_or("missing device type")?,
        },
        Some("attach") => Command::Attach {
            slot: parse_number(tokens.next(), "slot")?,
            port: parse_number(tokens.next(), "port")?,
            nio: tokens.next().ok_or("missing NIO name")?,
        },
        Some(other) => return Err(format!("unknown command '{}'", other)),
        None => return Ok(None),
    };

    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected argument '{}'", extra));
    }
    Ok(Some(command))
}

/// Applies every command of `text` to `bays`, stopping at the first failure.
///
/// Errors carry the 1-based line number.
pub fn apply_config_script(bays: &mut BayManager, text: &str) -> RouterResult<()> {
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let command = parse_line(line).map_err(|reason| RouterError::InvalidCommand {
            line: line_no,
            reason,
        })?;

        let result = match command {
            None => continue,
            Some(Command::Bind { slot, device_type }) => bays.bind(slot, device_type),
            Some(Command::Attach { slot, port, nio }) => bays.attach_backend(slot, port, nio),
        };

        result.map_err(|e| RouterError::InvalidCommand {
            line: line_no,
            reason: e.to_string(),
        })?;
        debug!(line = line_no, "Applied configuration command");
    }
    Ok(())
}
