//! Server-side query parameters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{CesError, Result};

/// Query string parameters, sent as `key=value` pairs.
pub type Query = BTreeMap<String, String>;

/// Flatten a serializable parameter struct into a [`Query`].
///
/// `None` fields are dropped, booleans become `true`/`false`, arrays become
/// comma-separated lists.
///
/// # Errors
///
/// Returns an error if the value does not serialize to a flat JSON object.
pub fn to_query<S: Serialize + ?Sized>(params: &S) -> Result<Query> {
    let value = serde_json::to_value(params)?;
    let Value::Object(map) = value else {
        return Err(CesError::InvalidConfig(
            "query parameters must serialize to an object".to_string(),
        ));
    };

    let mut query = Query::new();
    for (key, value) in map {
        if let Some(text) = scalar_text(&value)? {
            query.insert(key, text);
        }
    }
    Ok(query)
}

fn scalar_text(value: &Value) -> Result<Option<String>> {
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(scalar_text)
                .collect::<Result<Vec<_>>>()?;
            Some(parts.into_iter().flatten().collect::<Vec<_>>().join(","))
        }
        Value::Object(_) => {
            return Err(CesError::InvalidConfig(
                "nested objects are not supported in query parameters".to_string(),
            ))
        }
    })
}

/// Filters for listing projects.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    /// Filter by project type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<i64>,

    /// Filter by project status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_status: Option<i64>,

    /// Only projects that ended after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_since: Option<DateTime<Utc>>,

    /// Include projects of sub-accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_subaccounts: Option<bool>,
}

/// Filters for listing account users.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_types: Option<Vec<i64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_subaccounts: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_project_query_flattening() {
        let q = ProjectListQuery {
            project_status: Some(2),
            ended_since: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            include_subaccounts: Some(true),
            ..Default::default()
        };
        let query = to_query(&q).unwrap();

        assert_eq!(query.get("projectStatus").map(String::as_str), Some("2"));
        assert_eq!(
            query.get("endedSince").map(String::as_str),
            Some("2024-01-02T03:04:05Z")
        );
        assert_eq!(query.get("includeSubaccounts").map(String::as_str), Some("true"));
        assert!(!query.contains_key("projectType"));
    }

    #[test]
    fn test_user_query_lists() {
        let q = UserListQuery {
            user_types: Some(vec![1, 3]),
            ..Default::default()
        };
        let query = to_query(&q).unwrap();
        assert_eq!(query.get("userTypes").map(String::as_str), Some("1,3"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(to_query(&5).is_err());
    }
}
