//! Structural checks applied to each raw config layer before merging.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Expected JSON shape of a leaf setting.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Text,
    NullableText,
    Integer,
}

/// Known sections and their leaf settings.
const SECTIONS: &[(&str, &[(&str, Kind)])] = &[
    (
        "server",
        &[("base_url", Kind::Text), ("timeout_secs", Kind::Integer)],
    ),
    (
        "client",
        &[("domain", Kind::NullableText), ("page_url", Kind::NullableText)],
    ),
    ("storage", &[("path", Kind::NullableText)]),
    (
        "logging",
        &[("level", Kind::Text), ("file", Kind::NullableText)],
    ),
];

/// Reject unknown keys and mistyped values, naming the layer and key path.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let root = expect_object(value, layer, "")?;
    for (key, value) in root {
        if key == "$schema" {
            check_kind(value, Kind::Text, layer, key)?;
            continue;
        }
        let Some((_, fields)) = SECTIONS.iter().find(|(name, _)| name == key) else {
            return Err(invalid_field(layer, key, "unknown key"));
        };
        let section = expect_object(value, layer, key)?;
        for (field, value) in section {
            let path = format!("{key}.{field}");
            let Some((_, kind)) = fields.iter().find(|(name, _)| name == field) else {
                return Err(invalid_field(layer, &path, "unknown key"));
            };
            check_kind(value, *kind, layer, &path)?;
        }
    }
    Ok(())
}

fn check_kind(value: &Value, kind: Kind, layer: &str, path: &str) -> Result<(), ConfigError> {
    let ok = match kind {
        Kind::Text => value.is_string(),
        Kind::NullableText => value.is_string() || value.is_null(),
        Kind::Integer => value.is_u64(),
    };
    if ok {
        return Ok(());
    }
    let expected = match kind {
        Kind::Text => "expected string",
        Kind::NullableText => "expected string or null",
        Kind::Integer => "expected non-negative integer",
    };
    Err(invalid_field(layer, path, expected))
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid_field(layer, path, "expected object"))
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
