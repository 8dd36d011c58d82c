//! The skills manifest document (`apex_skills_manifest.json`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_OPERATIONAL: &str = "operational";

/// Skills exported by the execution layer, grouped by category.
///
/// `total_skills` is derived from `categories` on construction and is not
/// settable on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillsManifest {
    total_skills: usize,
    categories: BTreeMap<String, Vec<String>>,
    integration_status: String,
}

impl SkillsManifest {
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        let total_skills = categories.values().map(Vec::len).sum();
        Self {
            total_skills,
            categories,
            integration_status: STATUS_OPERATIONAL.to_string(),
        }
    }

    pub fn total_skills(&self) -> usize {
        self.total_skills
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn integration_status(&self) -> &str {
        &self.integration_status
    }

    /// Pretty JSON as written to disk, with a trailing newline.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

impl Default for SkillsManifest {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

pub fn default_categories() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, [&str; 3]); 4] = [
        (
            "forensic",
            ["extract_metadata", "analyze_file_system", "detect_patterns"],
        ),
        ("memory", ["smart_route", "unified_search", "cross_sync"]),
        ("api", ["github_ops", "confluence_ops", "notion_ops"]),
        ("workflow", ["auto_execute", "chain_skills", "parallel_ops"]),
    ];
    table
        .into_iter()
        .map(|(category, skills)| {
            (
                category.to_string(),
                skills.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(spec: &[(&str, usize)]) -> BTreeMap<String, Vec<String>> {
        spec.iter()
            .map(|(name, n)| {
                (
                    name.to_string(),
                    (0..*n).map(|i| format!("{}_{}", name, i)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn total_is_sum_of_category_lengths() {
        let cases: [&[(&str, usize)]; 5] = [
            &[],
            &[("solo", 0)],
            &[("a", 1), ("b", 2), ("c", 3)],
            &[("forensic", 3), ("memory", 3), ("api", 3), ("workflow", 3)],
            &[("large", 40), ("empty", 0), ("small", 1)],
        ];
        for case in cases {
            let manifest = SkillsManifest::new(categories(case));
            let expected: usize = case.iter().map(|(_, n)| n).sum();
            assert_eq!(manifest.total_skills(), expected, "case {:?}", case);
        }
    }

    #[test]
    fn default_manifest_counts_listed_skills() {
        let manifest = SkillsManifest::default();
        assert_eq!(manifest.total_skills(), 12);
        assert_eq!(manifest.category_count(), 4);
        assert_eq!(manifest.integration_status(), "operational");
    }

    #[test]
    fn serialized_shape_has_expected_fields() {
        let json = SkillsManifest::default().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_skills"], 12);
        assert_eq!(value["integration_status"], "operational");
        assert_eq!(value["categories"]["memory"][0], "smart_route");
        assert!(json.ends_with('\n'));
    }
}
