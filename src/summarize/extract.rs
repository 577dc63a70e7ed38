//! Best-effort parsing of generative-model responses into structured
//! records. Tier one expects a JSON array (models often wrap it in prose,
//! so the outermost bracketed slice is tried first); tier two is a
//! line-oriented scan over `field:` prefixes. When neither applies the
//! result is empty, never an error.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractedActionItem {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractedDecision {
    pub title: String,
    pub description: String,
    pub decision_maker: String,
    pub rationale: String,
}

pub fn parse_action_items(response: &str) -> Vec<ExtractedActionItem> {
    let items = parse_json_records(response)
        .unwrap_or_else(|| fallback_records(response, &["assignee", "due_date"]));
    items.into_iter().filter(|i: &ExtractedActionItem| !i.title.is_empty()).collect()
}

pub fn parse_decisions(response: &str) -> Vec<ExtractedDecision> {
    let items = parse_json_records(response)
        .unwrap_or_else(|| fallback_records(response, &["decision_maker", "rationale"]));
    items.into_iter().filter(|i: &ExtractedDecision| !i.title.is_empty()).collect()
}

/// The slice between the first `[` and the last `]`, when both exist.
fn json_array_slice(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    (end > start).then(|| &response[start..=end])
}

fn parse_json_records<T: DeserializeOwned>(response: &str) -> Option<Vec<T>> {
    let slice = json_array_slice(response).unwrap_or_else(|| response.trim());
    if let Ok(records) = serde_json::from_str::<Vec<T>>(slice) {
        return Some(records);
    }
    // A model returning a single object instead of an array still counts.
    serde_json::from_str::<T>(slice).ok().map(|record| vec![record])
}

trait FallbackRecord: Default {
    fn set_field(&mut self, field: &str, value: &str);
}

impl FallbackRecord for ExtractedActionItem {
    fn set_field(&mut self, field: &str, value: &str) {
        match field {
            "title" => self.title = value.to_string(),
            "description" => self.description = value.to_string(),
            "assignee" => self.assignee = value.to_string(),
            "due_date" => self.due_date = Some(value.to_string()),
            _ => {}
        }
    }
}

impl FallbackRecord for ExtractedDecision {
    fn set_field(&mut self, field: &str, value: &str) {
        match field {
            "title" => self.title = value.to_string(),
            "description" => self.description = value.to_string(),
            "decision_maker" => self.decision_maker = value.to_string(),
            "rationale" => self.rationale = value.to_string(),
            _ => {}
        }
    }
}

/// Line-oriented fallback: a new record starts at each `title:` line;
/// `description:` plus the two type-specific fields fill it in.
fn fallback_records<T: FallbackRecord>(response: &str, extra_fields: &[&str]) -> Vec<T> {
    let mut records = Vec::new();
    let mut current: Option<T> = None;

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("title:") {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let mut record = T::default();
            record.set_field("title", rest.trim());
            current = Some(record);
        } else if let Some(rest) = line.strip_prefix("description:") {
            if let Some(record) = current.as_mut() {
                record.set_field("description", rest.trim());
            }
        } else {
            for field in extra_fields {
                if let Some(rest) = line.strip_prefix(&format!("{field}:")) {
                    if let Some(record) = current.as_mut() {
                        record.set_field(field, rest.trim());
                    }
                }
            }
        }
    }

    if let Some(record) = current.take() {
        records.push(record);
    }
    records
}

/// Models emit due dates as anything from RFC 3339 to "next week"; only
/// shapes that actually parse become timestamps, the rest stay NULL.
pub fn parse_due_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_array_parses() {
        let response = r#"[
            {"title": "Draft proposal", "description": "Write v1", "assignee": "Alice", "due_date": "2024-06-01"},
            {"title": "Book room", "description": "", "assignee": "Bob"}
        ]"#;
        let items = parse_action_items(response);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Draft proposal");
        assert_eq!(items[0].due_date.as_deref(), Some("2024-06-01"));
        assert_eq!(items[1].assignee, "Bob");
        assert!(items[1].due_date.is_none());
    }

    #[test]
    fn json_array_wrapped_in_prose_parses() {
        let response = r#"Here are the decisions I found:
        [{"title": "Ship in June", "description": "d", "decision_maker": "PM", "rationale": "deadline"}]
        Let me know if you need more."#;
        let decisions = parse_decisions(response);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decision_maker, "PM");
    }

    #[test]
    fn bare_json_object_is_wrapped() {
        let response = r#"{"title": "Only one", "description": "", "assignee": "Kim"}"#;
        let items = parse_action_items(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Only one");
    }

    #[test]
    fn line_prefixed_fallback_parses() {
        let response = "title: Update docs\ndescription: Cover the new API\nassignee: Dana\ndue_date: Friday\ntitle: Ping legal\nassignee: Lee";
        let items = parse_action_items(response);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Update docs");
        assert_eq!(items[0].due_date.as_deref(), Some("Friday"));
        assert_eq!(items[1].title, "Ping legal");
        assert_eq!(items[1].assignee, "Lee");
        assert_eq!(items[1].description, "");
    }

    #[test]
    fn decision_fallback_uses_its_own_fields() {
        let response =
            "title: Adopt option A\ndecision_maker: Team lead\nrationale: Cheapest path";
        let decisions = parse_decisions(response);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].rationale, "Cheapest path");
    }

    #[test]
    fn fields_before_any_title_are_ignored() {
        let response = "assignee: Nobody\ndescription: stray\ntitle: Real item";
        let items = parse_action_items(response);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Real item");
        assert_eq!(items[0].assignee, "");
    }

    #[test]
    fn garbage_yields_empty_list() {
        assert!(parse_action_items("The meeting had no outcomes worth noting.").is_empty());
        assert!(parse_decisions("").is_empty());
    }

    #[test]
    fn untitled_records_are_dropped() {
        let response = r#"[{"description": "no title here", "assignee": "x"}]"#;
        assert!(parse_action_items(response).is_empty());
    }

    #[test]
    fn due_dates_parse_best_effort() {
        assert!(parse_due_date("2024-06-01").is_some());
        assert!(parse_due_date("2024-06-01T10:30:00").is_some());
        assert!(parse_due_date("2024-06-01 10:30:00").is_some());
        assert!(parse_due_date("2024-06-01T10:30:00Z").is_some());
        assert!(parse_due_date("next week").is_none());
        assert!(parse_due_date("").is_none());
    }
}
