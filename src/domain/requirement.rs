use crate::domain::lenient;
use crate::domain::priority::Priority;
use crate::domain::record_issue::{decode_each, RecordIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementType {
    UI,
    Workflow,
    Data,
    Integration,
    Report,
    Security,
    BusinessRule,
}

impl RequirementType {
    pub fn label(&self) -> &'static str {
        match self {
            RequirementType::UI => "UI",
            RequirementType::Workflow => "Workflow",
            RequirementType::Data => "Data",
            RequirementType::Integration => "Integration",
            RequirementType::Report => "Report",
            RequirementType::Security => "Security",
            RequirementType::BusinessRule => "BusinessRule",
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RequirementType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let has = |needle: &str| words.iter().any(|word| *word == needle);
        let joined = words.join(" ");

        if has("ui") || joined.contains("user interface") || has("screen") {
            Ok(RequirementType::UI)
        } else if has("workflow") || has("process") {
            Ok(RequirementType::Workflow)
        } else if has("data") || has("validation") {
            Ok(RequirementType::Data)
        } else if has("integration") {
            Ok(RequirementType::Integration)
        } else if has("report") || has("reporting") || has("inquiry") {
            Ok(RequirementType::Report)
        } else if has("security") || has("access") || has("authentication") {
            Ok(RequirementType::Security)
        } else if joined.contains("business rule")
            || has("businessrule")
            || has("calculation")
            || has("rule")
        {
            Ok(RequirementType::BusinessRule)
        } else {
            Err(format!("unknown requirement type '{}'", value.trim()))
        }
    }
}

/// One atomic, testable requirement enumerated from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
    pub module: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub testable: bool,
}

/// Requirement as the oracle writes it, before defaults are applied.
#[derive(Debug, Deserialize)]
pub struct RawRequirement {
    #[serde(default, alias = "id", deserialize_with = "lenient::optional_string")]
    pub requirement_id: Option<String>,
    #[serde(default, alias = "type", deserialize_with = "lenient::optional_string")]
    pub requirement_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub module: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_flag")]
    pub testable: Option<bool>,
}

pub const DEFAULT_MODULE: &str = "General";

pub fn positional_requirement_id(position: usize) -> String {
    format!("REQ-{:03}", position)
}

impl Requirement {
    /// Applies the defaulting rules: id by 1-based position, module "General",
    /// description falls back to the title, testable true. Title, type and
    /// priority have no default.
    pub fn from_raw(raw: RawRequirement, position: usize) -> Result<Requirement, String> {
        let title = raw.title.ok_or_else(|| "missing title".to_string())?;
        let requirement_type = raw
            .requirement_type
            .ok_or_else(|| "missing requirement_type".to_string())?
            .parse::<RequirementType>()?;
        let priority = raw
            .priority
            .ok_or_else(|| "missing priority".to_string())?
            .parse::<Priority>()?;

        Ok(Requirement {
            id: raw
                .requirement_id
                .unwrap_or_else(|| positional_requirement_id(position)),
            requirement_type,
            module: raw.module.unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            description: raw.description.unwrap_or_else(|| title.clone()),
            title,
            priority,
            testable: raw.testable.unwrap_or(true),
        })
    }
}

/// Decodes a requirement list. Missing ids get the positional `REQ-nnn`,
/// moved to the next free number when the response already uses it. A
/// repeated id is rejected and the first occurrence kept.
pub fn decode_requirements(items: Vec<Value>) -> (Vec<Requirement>, Vec<RecordIssue>) {
    let (raws, mut issues) = decode_each(items, |item, index| {
        serde_json::from_value::<RawRequirement>(item)
            .map(|raw| (index, raw))
            .map_err(|e| e.to_string())
    });

    let mut taken: HashSet<String> = raws
        .iter()
        .filter_map(|(_, raw)| raw.requirement_id.clone())
        .collect();
    let mut seen = HashSet::new();
    let mut requirements = Vec::with_capacity(raws.len());
    for (index, mut raw) in raws {
        if raw.requirement_id.is_none() {
            let mut position = index + 1;
            while taken.contains(&positional_requirement_id(position)) {
                position += 1;
            }
            let id = positional_requirement_id(position);
            taken.insert(id.clone());
            raw.requirement_id = Some(id);
        }
        match Requirement::from_raw(raw, index + 1) {
            Ok(requirement) if !seen.insert(requirement.id.clone()) => issues.push(RecordIssue::new(
                index,
                format!("duplicate requirement_id '{}'", requirement.id),
            )),
            Ok(requirement) => requirements.push(requirement),
            Err(reason) => issues.push(RecordIssue::new(index, reason)),
        }
    }
    issues.sort_by_key(|issue| issue.index);
    (requirements, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawRequirement {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_type_synonyms() {
        let cases = [
            ("UI", RequirementType::UI),
            ("User Interface", RequirementType::UI),
            ("Process", RequirementType::Workflow),
            ("Validation", RequirementType::Data),
            ("Reporting", RequirementType::Report),
            ("Business Rule/Calculation", RequirementType::BusinessRule),
            ("Calculation", RequirementType::BusinessRule),
            ("BusinessRule", RequirementType::BusinessRule),
            ("security", RequirementType::Security),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<RequirementType>().unwrap(), expected, "{}", input);
        }
        assert!("Build".parse::<RequirementType>().is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let requirement = Requirement::from_raw(
            raw(r#"{"requirement_type": "UI", "title": "Login screen", "priority": "High"}"#),
            7,
        )
        .unwrap();
        assert_eq!(requirement.id, "REQ-007");
        assert_eq!(requirement.module, DEFAULT_MODULE);
        assert_eq!(requirement.description, "Login screen");
        assert!(requirement.testable);
    }

    #[test]
    fn test_explicit_fields_kept() {
        let requirement = Requirement::from_raw(
            raw(r#"{"requirement_id": "REQ-101", "requirement_type": "Security", "module": "Auth",
                   "title": "Lockout", "description": "Lock after 3 attempts",
                   "priority": "critical", "testable": "false"}"#),
            1,
        )
        .unwrap();
        assert_eq!(requirement.id, "REQ-101");
        assert_eq!(requirement.priority, Priority::Critical);
        assert!(!requirement.testable);
    }

    #[test]
    fn test_default_ids_skip_stated_ones() {
        let items = vec![
            serde_json::json!({"requirement_id": "REQ-002", "type": "UI", "title": "A", "priority": "High"}),
            serde_json::json!({"type": "UI", "title": "B", "priority": "High"}),
            serde_json::json!({"type": "UI", "title": "C", "priority": "Low"}),
        ];
        let (requirements, issues) = decode_requirements(items);
        assert!(issues.is_empty());
        let ids: Vec<&str> = requirements.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["REQ-002", "REQ-003", "REQ-004"]);
    }

    #[test]
    fn test_repeated_stated_id_rejected() {
        let items = vec![
            serde_json::json!({"id": "R-1", "type": "UI", "title": "A", "priority": "High"}),
            serde_json::json!({"id": "R-1", "type": "UI", "title": "B", "priority": "High"}),
        ];
        let (requirements, issues) = decode_requirements(items);
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].title, "A");
        assert_eq!(issues[0].index, 1);
        assert!(issues[0].reason.contains("duplicate requirement_id"));
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let missing_title =
            Requirement::from_raw(raw(r#"{"requirement_type": "UI", "priority": "High"}"#), 1);
        assert!(missing_title.unwrap_err().contains("title"));

        let bad_priority = Requirement::from_raw(
            raw(r#"{"requirement_type": "UI", "title": "X", "priority": "Urgent"}"#),
            1,
        );
        assert!(bad_priority.is_err());
    }
}
