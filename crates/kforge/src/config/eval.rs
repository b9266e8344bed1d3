//! Variable evaluation for configuration bodies.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Variables available to `${var.NAME}` references in configuration bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    variables: BTreeMap<String, Value>,
}

impl EvalContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_variables(variables: BTreeMap<String, Value>) -> Self {
        Self { variables }
    }

    /// Add a variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve every variable reference in `value`.
    ///
    /// A string that is exactly one reference takes the variable's value and
    /// type. References embedded in longer strings are substituted as text.
    /// `$${` produces a literal `${`.
    #[must_use]
    pub fn evaluate(&self, value: &Value) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let evaluated = self.evaluate_value(value, &mut diags);
        (evaluated, diags)
    }

    fn evaluate_value(&self, value: &Value, diags: &mut Diagnostics) -> Value {
        match value {
            Value::String(s) => self.interpolate(s, diags),
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|item| self.evaluate_value(item, diags))
                    .collect(),
            ),
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.evaluate_value(v, diags));
                }
                Value::Mapping(out)
            }
            Value::Tagged(tagged) => self.evaluate_value(&tagged.value, diags),
            other => other.clone(),
        }
    }

    fn interpolate(&self, s: &str, diags: &mut Diagnostics) -> Value {
        if let Some(name) = whole_reference(s) {
            return match self.variables.get(name) {
                Some(v) => v.clone(),
                None => {
                    diags.push(unknown_variable(name));
                    Value::String(s.to_string())
                }
            };
        }

        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(pos) = rest.find("${") {
            if rest[..pos].ends_with('$') {
                out.push_str(&rest[..pos - 1]);
                out.push_str("${");
                rest = &rest[pos + 2..];
                continue;
            }

            out.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];
            let Some(end) = after.find('}') else {
                diags.error(
                    "Unterminated template sequence",
                    format!("Missing closing brace in {s:?}."),
                );
                out.push_str(&rest[pos..]);
                return Value::String(out);
            };

            let expr = after[..end].trim();
            match expr.strip_prefix("var.") {
                Some(name) => match self.variables.get(name) {
                    Some(v) => match scalar_to_string(v) {
                        Some(text) => out.push_str(&text),
                        None => diags.error(
                            "Invalid template interpolation value",
                            format!(
                                "Variable {name:?} is not a string, number or bool and cannot be embedded in a string."
                            ),
                        ),
                    },
                    None => diags.push(unknown_variable(name)),
                },
                None => diags.error(
                    "Unsupported expression",
                    format!("Only variable references like ${{var.name}} are supported, found ${{{expr}}}."),
                ),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Value::String(out)
    }
}

fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        return None;
    }
    inner.trim().strip_prefix("var.")
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn unknown_variable(name: &str) -> Diagnostic {
    Diagnostic::error(
        "Unknown variable",
        format!("There is no variable named {name:?}."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EvalContext {
        EvalContext::new()
            .with_variable("region", "eu-central-1")
            .with_variable("mtu", 1480)
            .with_variable("keys", Value::Sequence(vec!["ssh-rsa AAA".into()]))
    }

    #[test]
    fn test_whole_reference_keeps_type() {
        let (v, diags) = ctx().evaluate(&Value::from("${var.mtu}"));
        assert!(diags.is_empty());
        assert_eq!(v, Value::from(1480));

        let (v, _) = ctx().evaluate(&Value::from("${var.keys}"));
        assert!(v.is_sequence());
    }

    #[test]
    fn test_embedded_reference() {
        let (v, diags) = ctx().evaluate(&Value::from("s3.${var.region}.amazonaws.com"));
        assert!(diags.is_empty());
        assert_eq!(v, Value::from("s3.eu-central-1.amazonaws.com"));
    }

    #[test]
    fn test_escaped_reference_is_literal() {
        let (v, diags) = ctx().evaluate(&Value::from("echo $${HOME}"));
        assert!(diags.is_empty());
        assert_eq!(v, Value::from("echo ${HOME}"));
    }

    #[test]
    fn test_unknown_variables_are_all_reported() {
        let body: Value = serde_yaml::from_str("a: ${var.one}\nb: [\"x-${var.two}\"]\n").unwrap();
        let (_, diags) = ctx().evaluate(&body);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.summary == "Unknown variable"));
    }

    #[test]
    fn test_sequence_cannot_be_embedded() {
        let (_, diags) = ctx().evaluate(&Value::from("keys: ${var.keys}"));
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().unwrap().summary,
            "Invalid template interpolation value"
        );
    }

    #[test]
    fn test_unterminated_sequence() {
        let (v, diags) = ctx().evaluate(&Value::from("broken ${var.region"));
        assert!(diags.has_errors());
        assert_eq!(v, Value::from("broken ${var.region"));
    }
}
