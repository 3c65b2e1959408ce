//! Severity to emoji short code and badge image mapping.

use crate::types::Severity;

const IMAGES_ROOT_URL: &str =
    "https://github.com/gabrie-allaigre/sonar-gitlab-plugin/raw/master/images/";

/// Glyph for severities the mapper does not know
pub const FALLBACK_GLYPH: &str = ":grey_question:";

pub fn glyph_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Blocker => ":no_entry:",
        Severity::Critical => ":no_entry_sign:",
        Severity::Major => ":warning:",
        Severity::Minor => ":arrow_down_small:",
        Severity::Info => ":information_source:",
    }
}

/// Glyph by severity name, degrading to [`FALLBACK_GLYPH`] for unknown names
pub fn glyph_for_name(name: &str) -> &'static str {
    name.parse::<Severity>()
        .map(glyph_for)
        .unwrap_or(FALLBACK_GLYPH)
}

/// Markdown image reference for the severity badge
pub fn badge_for(severity: Severity) -> String {
    badge(severity.name(), &severity.name().to_lowercase())
}

pub fn badge_for_name(name: &str) -> String {
    match name.parse::<Severity>() {
        Ok(severity) => badge_for(severity),
        Err(_) => badge(name, &name.to_lowercase()),
    }
}

fn badge(alt: &str, level: &str) -> String {
    format!("![{}]({}severity-{}.png)", alt, IMAGES_ROOT_URL, level)
}
