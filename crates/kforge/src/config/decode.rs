//! Decoding configuration bodies into typed configuration.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::{ConfigBody, EvalContext};
use crate::diagnostics::{Diagnostic, Diagnostics};

/// Typed configuration that can be decoded from a [`ConfigBody`].
pub trait Decode: Serialize + DeserializeOwned {
    /// Top-level keys that must be present in the body.
    const REQUIRED: &'static [&'static str] = &[];
}

/// Decode `body` into `target`, which already holds the factory defaults.
///
/// A missing body decodes like an empty mapping, so required keys are still
/// reported. Keys present in the body override the matching fields of `target`; keys
/// that are absent (or explicitly null) keep their default. Nested mappings
/// are merged, sequences are replaced. Problems are returned as diagnostics
/// and `target` is left untouched when any error is found.
pub fn decode_body<T: Decode>(
    body: Option<&ConfigBody>,
    ctx: &EvalContext,
    target: &mut T,
) -> Diagnostics {
    let empty = Value::Null;
    let (evaluated, mut diags) = ctx.evaluate(body.map_or(&empty, ConfigBody::as_value));

    let overrides = match evaluated {
        Value::Mapping(map) => map,
        Value::Null => Mapping::new(),
        other => {
            diags.push(Diagnostic::error(
                "Invalid configuration body",
                format!("Expected a mapping of arguments, found {}.", kind(&other)),
            ));
            return diags;
        }
    };

    for key in T::REQUIRED {
        let present = overrides.get(*key).is_some_and(|v| !v.is_null());
        if !present {
            diags.error(
                "Missing required argument",
                format!("The argument {key:?} is required, but no definition was found."),
            );
        }
    }

    if diags.has_errors() {
        return diags;
    }

    let mut base = match serde_yaml::to_value(&*target) {
        Ok(v) => v,
        Err(e) => {
            diags.error("Invalid default configuration", e.to_string());
            return diags;
        }
    };
    merge(&mut base, Value::Mapping(overrides));

    match serde_yaml::from_value::<T>(base) {
        Ok(decoded) => *target = decoded,
        Err(e) => diags.error("Invalid configuration", e.to_string()),
    }

    diags
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (k, v) in overlay {
                let both_mappings = v.is_mapping() && base.get(&k).is_some_and(Value::is_mapping);
                if both_mappings {
                    if let Some(existing) = base.get_mut(&k) {
                        merge(existing, v);
                    }
                } else if !v.is_null() {
                    base.insert(k, v);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        name: String,
        #[serde(default)]
        replicas: u32,
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        nested: Nested,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct Nested {
        provider: String,
        bucket: String,
    }

    impl Default for Nested {
        fn default() -> Self {
            Self {
                provider: "aws".to_string(),
                bucket: String::new(),
            }
        }
    }

    impl Decode for Sample {
        const REQUIRED: &'static [&'static str] = &["name"];
    }

    fn defaults() -> Sample {
        Sample {
            name: String::new(),
            replicas: 3,
            enabled: true,
            nested: Nested::default(),
        }
    }

    fn body(yaml: &str) -> ConfigBody {
        ConfigBody::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_unset_fields_keep_defaults() {
        let mut target = defaults();
        let diags = decode_body(Some(&body("name: demo\n")), &EvalContext::new(), &mut target);

        assert!(diags.is_empty(), "{diags}");
        assert_eq!(target.name, "demo");
        assert_eq!(target.replicas, 3);
        assert!(target.enabled);
    }

    #[test]
    fn test_nested_mapping_is_merged() {
        let mut target = defaults();
        let diags = decode_body(
            Some(&body("name: demo\nnested:\n  bucket: backups\n")),
            &EvalContext::new(),
            &mut target,
        );

        assert!(diags.is_empty(), "{diags}");
        assert_eq!(target.nested.bucket, "backups");
        assert_eq!(target.nested.provider, "aws");
    }

    #[test]
    fn test_missing_required_is_a_diagnostic() {
        let mut target = defaults();
        let diags = decode_body(Some(&body("replicas: 1\n")), &EvalContext::new(), &mut target);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "Missing required argument");
        assert_eq!(target, defaults());
    }

    #[test]
    fn test_missing_body_reports_required_keys() {
        let mut target = defaults();
        let diags = decode_body(None, &EvalContext::new(), &mut target);

        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().detail.contains("\"name\""));
        assert_eq!(target, defaults());
    }

    #[test]
    fn test_unknown_key_is_a_diagnostic() {
        let mut target = defaults();
        let diags = decode_body(Some(&body("name: a\nreplica: 1\n")), &EvalContext::new(), &mut target);

        assert_eq!(diags.len(), 1);
        assert!(diags.iter().next().unwrap().detail.contains("replica"));
    }

    #[test]
    fn test_type_mismatch_is_a_diagnostic() {
        let mut target = defaults();
        let diags = decode_body(
            Some(&body("name: a\nreplicas: many\n")),
            &EvalContext::new(),
            &mut target,
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn test_variables_are_evaluated() {
        let ctx = EvalContext::new().with_variable("count", 5);
        let mut target = defaults();
        let diags = decode_body(Some(&body("name: a\nreplicas: ${var.count}\n")), &ctx, &mut target);

        assert!(diags.is_empty(), "{diags}");
        assert_eq!(target.replicas, 5);
    }

    #[test]
    fn test_non_mapping_body() {
        let mut target = defaults();
        let diags = decode_body(Some(&body("- a\n- b\n")), &EvalContext::new(), &mut target);
        assert_eq!(diags.iter().next().unwrap().summary, "Invalid configuration body");
    }
}
