//! Dependency integration scores for the matrix view.
//!
//! Scores are static heuristics keyed on the package name; no registry
//! lookups are made.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Logo used when no package homepage is known.
pub const FALLBACK_LOGO_URL: &str = "https://logo.clearbit.com/npmjs.com";

const CORE_PACKAGES: &[&str] = &["next", "react", "react-dom"];

const CATEGORY_RULES: &[(&str, &str)] = &[
    ("Cloud", r"aws|azure|gcp|firebase|supabase"),
    ("Visualization", r"chart|d3|graph|plot"),
    ("Styling", r"tailwind|bootstrap|css|sass|style|mui"),
    ("Tooling", r"lint|eslint|prettier|babel|webpack|vite"),
    ("Infra & DevOps", r"zip|fs|path|express|axios|server"),
    ("ML/AI", r"ai|ml|openai|tensorflow|torch"),
];

const DEFAULT_CATEGORY: &str = "Frameworks/Libs";

static CATEGORY_RES: Lazy<Vec<(&str, Regex)>> = Lazy::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|(category, pattern)| (*category, Regex::new(pattern).unwrap()))
        .collect()
});

/// First matching category for a package name (case-insensitive).
pub fn categorize(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    CATEGORY_RES
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Integration scores, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scores {
    pub impact: u8,
    pub security: u8,
    pub ops: u8,
    pub health: u8,
    pub coupling: u8,
    pub upgrade: u8,
}

pub fn scores(name: &str) -> Scores {
    let core = CORE_PACKAGES.contains(&name);
    Scores {
        impact: if core { 90 } else { 60 },
        security: 70,
        ops: 60,
        health: 80,
        coupling: if core { 70 } else { 50 },
        upgrade: 60,
    }
}

/// One row of the integration matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRow {
    pub name: String,
    pub category: String,
    pub logo_url: String,
    #[serde(flatten)]
    pub scores: Scores,
}

/// Rows for a comma-separated dependency list; blank entries are skipped.
pub fn component_rows(deps: &str) -> Vec<ComponentRow> {
    deps.split(',')
        .map(str::trim)
        .filter(|dep| !dep.is_empty())
        .map(|dep| ComponentRow {
            name: dep.to_string(),
            category: categorize(dep).to_string(),
            logo_url: FALLBACK_LOGO_URL.to_string(),
            scores: scores(dep),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(CATEGORY_RES.len(), CATEGORY_RULES.len());
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("@supabase/supabase-js"), "Cloud");
        assert_eq!(categorize("Chart.js"), "Visualization");
        assert_eq!(categorize("tailwindcss"), "Styling");
        assert_eq!(categorize("eslint"), "Tooling");
        assert_eq!(categorize("adm-zip"), "Infra & DevOps");
        assert_eq!(categorize("openai"), "ML/AI");
        assert_eq!(categorize("react"), "Frameworks/Libs");
    }

    #[test]
    fn test_rule_order_wins() {
        // "firebase-charts" matches Cloud before Visualization.
        assert_eq!(categorize("firebase-charts"), "Cloud");
    }

    #[test]
    fn test_core_package_scores() {
        let core = scores("react");
        assert_eq!((core.impact, core.coupling), (90, 70));
        let other = scores("lodash");
        assert_eq!((other.impact, other.coupling), (60, 50));
        assert_eq!(other.health, 80);
    }

    #[test]
    fn test_component_rows_skip_blanks_and_flatten_scores() {
        let rows = component_rows("react, ,three,");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "three");

        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(value["logoUrl"], FALLBACK_LOGO_URL);
        assert_eq!(value["impact"], 90);
        assert_eq!(value["category"], "Frameworks/Libs");
    }
}
