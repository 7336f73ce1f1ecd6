//! # Request Validation
//!
//! A [`RequestSchema`] is compiled once at startup and shared across
//! requests. Validating a payload:
//!
//! 1. converts string values of `number`, `integer`, and `boolean`
//!    properties (query and path parameters always arrive as strings);
//! 2. applies defaults (`default`, `x-default: "now"`) to missing
//!    properties;
//! 3. reports each missing `required` property;
//! 4. runs the compiled schema and maps every remaining error to the
//!    property's `x-messages` entry for the failing keyword.
//!
//! On success the normalized payload (defaults filled in, unknown fields
//! kept) is returned for the handler to deserialize.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{SchemaError, Violation};

/// A compiled request schema.
pub struct RequestSchema {
    name: &'static str,
    document: Value,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for RequestSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RequestSchema {
    /// Compile a schema document.
    pub fn compile(name: &'static str, document: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(true)
            .build(&document)
            .map_err(|e| SchemaError::Compile {
                schema: name,
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            document,
            validator,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The schema document, for API docs.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate and normalize a payload.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Invalid`] listing every violation.
    pub fn validate(&self, data: Value) -> Result<Value, SchemaError> {
        let Value::Object(mut data) = data else {
            return Err(self.invalid(vec![Violation {
                field: String::new(),
                keyword: "type".into(),
                message: "Request payload must be a JSON object".into(),
            }]));
        };
        self.coerce_scalars(&mut data);
        self.apply_defaults(&mut data);

        let mut violations = self.missing_required(&data);
        let instance = Value::Object(data);
        for err in self.validator.iter_errors(&instance) {
            let schema_path = err.schema_path.to_string();
            let keyword = schema_path.rsplit('/').next().unwrap_or_default();
            // Reported above, with the property name attached.
            if keyword == "required" {
                continue;
            }
            let field = top_level_field(&err.instance_path.to_string());
            let message = self
                .message_for(&field, keyword)
                .unwrap_or_else(|| format!("{field} {err}").trim().to_string());
            if violations.iter().all(|v| v.message != message) {
                violations.push(Violation {
                    field,
                    keyword: keyword.to_string(),
                    message,
                });
            }
        }

        if violations.is_empty() {
            Ok(instance)
        } else {
            Err(self.invalid(violations))
        }
    }

    fn invalid(&self, violations: Vec<Violation>) -> SchemaError {
        SchemaError::Invalid {
            schema: self.name,
            violations,
        }
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.document.get("properties").and_then(Value::as_object)
    }

    /// Replace string values that parse as the property's scalar type.
    /// Strings that do not parse are left for the validator to report.
    fn coerce_scalars(&self, data: &mut Map<String, Value>) {
        let Some(properties) = self.properties() else {
            return;
        };
        for (name, value) in data.iter_mut() {
            let Value::String(raw) = value else {
                continue;
            };
            let Some(kind) = properties
                .get(name)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if let Some(converted) = coerce(kind, raw.trim()) {
                *value = converted;
            }
        }
    }

    fn apply_defaults(&self, data: &mut Map<String, Value>) {
        let Some(properties) = self.properties() else {
            return;
        };
        for (name, property) in properties {
            if data.contains_key(name) {
                continue;
            }
            if let Some(default) = property.get("default") {
                data.insert(name.clone(), default.clone());
            } else if property.get("x-default").and_then(Value::as_str) == Some("now") {
                let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                data.insert(name.clone(), Value::String(now));
            }
        }
    }

    fn missing_required(&self, data: &Map<String, Value>) -> Vec<Violation> {
        let required = self
            .document
            .get("required")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        required
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| !data.contains_key(*name))
            .map(|name| Violation {
                field: name.to_string(),
                keyword: "required".into(),
                message: self
                    .message_for(name, "required")
                    .unwrap_or_else(|| format!("{name} is required")),
            })
            .collect()
    }

    fn message_for(&self, field: &str, keyword: &str) -> Option<String> {
        self.properties()?
            .get(field)?
            .get("x-messages")?
            .get(keyword)?
            .as_str()
            .map(str::to_string)
    }
}

fn coerce(kind: &str, raw: &str) -> Option<Value> {
    match kind {
        "integer" => match raw.parse::<i64>() {
            Ok(n) => Some(Value::from(n)),
            Err(_) => coerce("number", raw),
        },
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "boolean" => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// First segment of a JSON Pointer, unescaped. Empty for the root.
fn top_level_field(pointer: &str) -> String {
    pointer
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .replace("~1", "/")
        .replace("~0", "~")
}

/// Merge request sources into one object for validation.
///
/// Later sources overwrite earlier ones: body, then path parameters, then
/// query parameters. A missing body counts as `{}`.
///
/// # Errors
///
/// [`SchemaError::Invalid`] when the body is present but not an object.
pub fn merge_sources<P, Q>(
    schema: &'static str,
    body: Option<Value>,
    path: P,
    query: Q,
) -> Result<Value, SchemaError>
where
    P: IntoIterator<Item = (String, String)>,
    Q: IntoIterator<Item = (String, String)>,
{
    let mut merged = match body {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(SchemaError::Invalid {
                schema,
                violations: vec![Violation {
                    field: String::new(),
                    keyword: "type".into(),
                    message: "Request body must be a JSON object".into(),
                }],
            })
        }
    };
    for (key, value) in path.into_iter().chain(query) {
        merged.insert(key, Value::String(value));
    }
    Ok(Value::Object(merged))
}
