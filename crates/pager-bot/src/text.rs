//! Small text helpers used by commands.

use crate::errors::BotError;

/// Strip leading whitespace from every line.
///
/// Whitespace-only lines collapse entirely, terminator included.
pub fn dedent(text: &str) -> String {
    text.split_inclusive('\n').map(str::trim_start).collect()
}

/// Format `value` with a `"singular|plural"` noun spec.
///
/// When the plural half is missing an `s` is appended to the singular.
pub fn plural(value: i64, spec: &str) -> String {
    let (singular, plural) = match spec.split_once('|') {
        Some((singular, plural)) if !plural.is_empty() => (singular.to_string(), plural.to_string()),
        Some((singular, _)) => (singular.to_string(), format!("{}s", singular)),
        None => (spec.to_string(), format!("{}s", spec)),
    };
    if value.abs() == 1 {
        format!("{} {}", value, singular)
    } else {
        format!("{} {}", value, plural)
    }
}

/// Break every line longer than `width` chars into pieces, so that each
/// resulting line, terminator included, is at most `width` chars.
pub fn wrap_long_lines(text: &str, width: usize) -> String {
    let piece = width.saturating_sub(1).max(1);
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        if line.chars().count() <= width {
            out.push_str(line);
            continue;
        }
        let (body, terminated) = match line.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (line, false),
        };
        let chars: Vec<char> = body.chars().collect();
        let pieces: Vec<String> = chars.chunks(piece).map(|c| c.iter().collect()).collect();
        out.push_str(&pieces.join("\n"));
        if terminated {
            out.push('\n');
        }
    }
    out
}

const TRUTHY: &[&str] = &[
    "yes", "y", "true", "t", "1", "positive", "+", "yeah", "enable", "enabled", "on",
];

const FALSY: &[&str] = &[
    "no", "n", "false", "f", "0", "negative", "-", "nope", "disable", "disabled", "off",
];

/// Parse a loose yes/no answer.
pub fn parse_bool(argument: &str) -> Result<bool, BotError> {
    let lowered = argument.trim().to_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(BotError::User(format!(
            "Couldn't determine a boolean value from `{}`",
            argument
        )))
    }
}
