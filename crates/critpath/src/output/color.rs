//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Low risk:   green
//!   - Warning/Medium:     yellow
//!   - Error/High, Critical, critical-path tasks: red
//!   - Info/Reference:     cyan   (task IDs)
//!   - Muted:              dimmed (field labels, non-critical rows)
//!   - Emphasis:           bold   (section headers)

use crate::enrichment::RiskLevel;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Colorize a task ID (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

/// Apply color to a risk band.
pub(crate) fn colorize_risk(risk: RiskLevel, config: &OutputConfig) -> String {
    let text = risk.to_string();
    if !config.use_colors {
        return text;
    }
    match risk {
        RiskLevel::Critical => text.red().bold().to_string(),
        RiskLevel::High => text.red().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::Low => text.green().to_string(),
    }
}

/// Bold text, for section headers.
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Dimmed text, for labels and secondary rows.
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RiskLevel::Low)]
    #[case(RiskLevel::Medium)]
    #[case(RiskLevel::High)]
    #[case(RiskLevel::Critical)]
    fn test_plain_risk_without_colors(#[case] risk: RiskLevel) {
        let config = OutputConfig::new(false);
        assert_eq!(colorize_risk(risk, &config), risk.to_string());
    }

    #[test]
    fn test_helpers_pass_text_through_without_colors() {
        let config = OutputConfig::new(false);
        assert_eq!(success("ok", &config), "ok");
        assert_eq!(error("bad", &config), "bad");
        assert_eq!(warning("hmm", &config), "hmm");
        assert_eq!(colorize_id("a-1", &config), "a-1");
        assert_eq!(bold("Title", &config), "Title");
        assert_eq!(dimmed("label", &config), "label");
    }
}
