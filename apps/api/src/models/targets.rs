use serde::{Deserialize, Serialize};

use super::null_as_empty;

/// A company the owner is applying to, with the tags the builder should favor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub priority_tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_hint")]
    pub summary_hint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetList {
    #[serde(deserialize_with = "null_as_empty")]
    pub targets: Vec<Target>,
}

impl TargetList {
    pub fn find(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }
}

fn deserialize_hint<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_reads_camel_case_and_nulls() {
        let list: TargetList = serde_json::from_value(json!({
            "targets": [
                { "id": "t1", "company": "Acme", "role": "Backend", "priorityTags": null, "summaryHint": null }
            ]
        }))
        .unwrap();
        let target = list.find("t1").unwrap();
        assert!(target.priority_tags.is_empty());
        assert_eq!(target.summary_hint, "");
        assert!(list.find("missing").is_none());
    }

    #[test]
    fn test_missing_targets_key_is_empty_list() {
        let list: TargetList = serde_json::from_value(json!({})).unwrap();
        assert!(list.targets.is_empty());
    }
}
