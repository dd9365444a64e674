//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::ripple::MAX_DELAY_DAYS;

/// Validate a task ID: non-empty after trimming, no whitespace inside.
pub fn validate_task_id(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Task ID cannot be empty".to_string());
    }
    if s.chars().any(char::is_whitespace) {
        return Err(format!("Task ID '{s}' must not contain whitespace"));
    }
    Ok(s.to_string())
}

/// Parse an `ID=DAYS` delay assignment.
///
/// Days must be a whole number no larger than the simulation cap.
pub fn parse_delay(s: &str) -> Result<(String, u32), String> {
    let (id, days) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid delay '{s}'. Expected format: TASK_ID=DAYS"))?;

    let id = validate_task_id(id)?;
    let days: u32 = days
        .trim()
        .parse()
        .map_err(|_| format!("Invalid delay days '{}' for task '{id}'", days.trim()))?;
    if days > MAX_DELAY_DAYS {
        return Err(format!(
            "Delay for task '{id}' cannot exceed {MAX_DELAY_DAYS} days"
        ));
    }
    Ok((id, days))
}
