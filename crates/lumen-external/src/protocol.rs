//! JSON protocol spoken by external extensions on stdout.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ExternalError;

/// Interface id every extension must report from `METADATA`.
pub const INTERFACE_ID: &str = "org.lumen.extension.external/v1";

/// A parsed response object.
pub type Response = Map<String, Value>;

/// Answer to the `METADATA` operation.
///
/// Fields of the wrong JSON type read as absent instead of rejecting the
/// whole extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Interface id.
    #[serde(default, deserialize_with = "lenient_string")]
    pub iid: Option<String>,
    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Version string.
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    /// Author.
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    /// Trigger token; empty or absent means global.
    #[serde(default, deserialize_with = "lenient_string")]
    pub trigger: Option<String>,
    /// Executables that must be on `PATH`.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub dependencies: Vec<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(value) => Some(value),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl Metadata {
    /// Parses metadata and checks the interface id.
    pub fn from_response(response: &Response) -> Result<Self, ExternalError> {
        let metadata: Metadata = serde_json::from_value(Value::Object(response.clone()))?;

        match metadata.iid.as_deref() {
            None => Err(ExternalError::Protocol(
                "Metadata does not contain an interface id".to_string(),
            )),
            Some(INTERFACE_ID) => Ok(metadata),
            Some(other) => Err(ExternalError::InterfaceMismatch {
                found: other.to_string(),
                expected: INTERFACE_ID,
            }),
        }
    }

    /// The trigger, if set and non-empty.
    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref().filter(|t| !t.is_empty())
    }
}

/// One action of a query item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Program to launch.
    #[serde(default)]
    pub command: String,
    /// Program arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// One item of a `QUERY` answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Item id, used for usage history.
    #[serde(default)]
    pub id: String,
    /// Primary text.
    #[serde(default)]
    pub name: String,
    /// Secondary text.
    #[serde(default)]
    pub description: String,
    /// Text for tab completion.
    #[serde(default)]
    pub completion: String,
    /// Icon name or path.
    #[serde(default)]
    pub icon: String,
    /// Ranking importance.
    #[serde(default)]
    pub importance: i32,
    /// Relevance score.
    #[serde(default)]
    pub score: f64,
    /// Actions; the first is the default.
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Parses stdout into a response object.
pub fn parse_response(stdout: &[u8]) -> Result<Response, ExternalError> {
    match serde_json::from_slice::<Value>(stdout)? {
        Value::Object(object) => Ok(object),
        other => Err(ExternalError::Protocol(format!(
            "Expected a JSON object, received {}",
            json_type(&other)
        ))),
    }
}

/// Extracts the `variables` of a response.
///
/// Absent variables yield an empty map. Non-string values are dropped.
/// A `variables` entry that is not an object is an error; callers clear
/// their stored variables in that case as well.
pub fn variables(response: &Response) -> Result<HashMap<String, String>, ExternalError> {
    match response.get("variables") {
        None => Ok(HashMap::new()),
        Some(Value::Object(vars)) => Ok(vars
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()),
        Some(_) => Err(ExternalError::Protocol(
            "'variables' is not a JSON object".to_string(),
        )),
    }
}

/// Extracts the `items` of a `QUERY` response. Malformed entries are
/// skipped with a warning.
pub fn items(response: &Response, extension_id: &str) -> Result<Vec<ItemSpec>, ExternalError> {
    let Some(items) = response.get("items") else {
        return Err(ExternalError::Protocol(
            "Result contains no items".to_string(),
        ));
    };
    let Value::Array(items) = items else {
        return Err(ExternalError::Protocol("'items' is not an array".to_string()));
    };

    let mut specs = Vec::with_capacity(items.len());
    for value in items {
        if !value.is_object() {
            warn!(extension_id = %extension_id, "Item is not a JSON object, skipping");
            continue;
        }
        match serde_json::from_value::<ItemSpec>(value.clone()) {
            Ok(spec) => specs.push(spec),
            Err(e) => warn!(extension_id = %extension_id, error = %e, "Malformed item, skipping"),
        }
    }

    Ok(specs)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
