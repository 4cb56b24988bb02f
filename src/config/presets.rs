//! Built-in styleguide presets.
//!
//! Each preset assigns a severity to *every* built-in rule id, so a later
//! preset in an `extends` chain fully overrides an earlier one.

use crate::config::schema::RawStyleguide;

/// Rule ids in the order presets declare them.
const RULE_IDS: [&str; 14] = [
    "spec",
    "no-unresolved-refs",
    "operation-2xx-response",
    "operation-4xx-response",
    "operation-operation-id",
    "operation-operation-id-unique",
    "operation-summary",
    "no-path-trailing-slash",
    "path-not-include-query",
    "no-identical-paths",
    "no-empty-servers",
    "tag-description",
    "info-contact",
    "info-license",
];

/// Look up a preset styleguide by name.
pub fn preset(name: &str) -> Option<RawStyleguide> {
    let severities: [&str; 14] = match name {
        "minimal" => [
            "error", "error", "warn", "off", "warn", "warn", "off", "off", "warn", "warn", "off",
            "off", "off", "off",
        ],
        "recommended" => [
            "error", "error", "warn", "warn", "warn", "error", "warn", "warn", "warn", "error",
            "warn", "warn", "off", "warn",
        ],
        "recommended-strict" => [
            "error", "error", "error", "error", "error", "error", "error", "error", "error",
            "error", "error", "error", "off", "error",
        ],
        "all" => [
            "error", "error", "error", "error", "error", "error", "error", "error", "error",
            "error", "error", "error", "error", "error",
        ],
        _ => return None,
    };
    let mut styleguide = RawStyleguide::default();
    for (id, severity) in RULE_IDS.iter().zip(severities) {
        styleguide.set_rule(id, severity);
    }
    Some(styleguide)
}

/// Whether a name is a known preset.
pub fn is_preset(name: &str) -> bool {
    matches!(
        name,
        "minimal" | "recommended" | "recommended-strict" | "all"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_cover_every_rule_id() {
        for name in ["minimal", "recommended", "recommended-strict", "all"] {
            let styleguide = preset(name).unwrap();
            assert_eq!(styleguide.rules.len(), RULE_IDS.len(), "preset {}", name);
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(preset("strictest").is_none());
        assert!(!is_preset("strictest"));
    }

    #[test]
    fn recommended_strict_has_no_warns() {
        let styleguide = preset("recommended-strict").unwrap();
        for (_, value) in &styleguide.rules {
            assert_ne!(value.as_str(), Some("warn"));
        }
    }

    #[test]
    fn presets_keep_spec_checks_on() {
        for name in ["minimal", "recommended", "recommended-strict", "all"] {
            let styleguide = preset(name).unwrap();
            assert_eq!(
                styleguide.rules.get("spec").and_then(|v| v.as_str()),
                Some("error"),
                "preset {}",
                name
            );
        }
    }
}
