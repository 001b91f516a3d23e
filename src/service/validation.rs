//! Request validation from config rules. Every failing rule is reported, keyed by field.

use crate::config::ValidationRule;
use crate::error::{AppError, ValidationErrors};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator<'a> {
    rules: &'a HashMap<String, ValidationRule>,
    /// Custom messages keyed `field.rule`; `:attribute` is replaced by the field name.
    messages: &'a HashMap<String, String>,
}

impl<'a> RequestValidator<'a> {
    pub fn new(
        rules: &'a HashMap<String, ValidationRule>,
        messages: &'a HashMap<String, String>,
    ) -> Self {
        RequestValidator { rules, messages }
    }

    /// Validate body against every rule. Required fields must be present and non-empty.
    pub fn validate(&self, body: &Map<String, Value>) -> Result<(), AppError> {
        let mut errors = ValidationErrors::default();
        for (col, rule) in self.sorted_rules() {
            let val = body.get(col);
            if rule.required == Some(true) && is_blank(val) {
                errors.add(col, self.message(col, "required", format!("{} is required", col)));
                continue;
            }
            if let Some(v) = val {
                self.validate_field(col, v, rule, &mut errors);
            }
        }
        finish(errors)
    }

    /// Validate only the fields present in body (for PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(&self, body: &Map<String, Value>) -> Result<(), AppError> {
        let mut errors = ValidationErrors::default();
        for (col, rule) in self.sorted_rules() {
            let Some(v) = body.get(col) else { continue };
            if rule.required == Some(true) && is_blank(Some(v)) {
                errors.add(col, self.message(col, "required", format!("{} is required", col)));
                continue;
            }
            self.validate_field(col, v, rule, &mut errors);
        }
        finish(errors)
    }

    fn sorted_rules(&self) -> Vec<(&'a String, &'a ValidationRule)> {
        let mut rules: Vec<_> = self.rules.iter().collect();
        rules.sort_by(|a, b| a.0.cmp(b.0));
        rules
    }

    fn message(&self, col: &str, rule: &str, default: String) -> String {
        self.messages
            .get(&format!("{}.{}", col, rule))
            .map(|m| m.replace(":attribute", col))
            .unwrap_or(default)
    }

    fn validate_field(&self, col: &str, v: &Value, rule: &ValidationRule, errors: &mut ValidationErrors) {
        if v.is_null() {
            return;
        }
        if let Some(format) = &rule.format {
            if let Some(msg) = validate_format(col, v, format) {
                errors.add(col, self.message(col, "format", msg));
            }
        }
        if let Some(max) = rule.max_length {
            if let Some(s) = v.as_str() {
                if s.chars().count() > max as usize {
                    let default = format!("{} must be at most {} characters", col, max);
                    errors.add(col, self.message(col, "max_length", default));
                }
            }
        }
        if let Some(min) = rule.min_length {
            if let Some(s) = v.as_str() {
                if s.chars().count() < min as usize {
                    let default = format!("{} must be at least {} characters", col, min);
                    errors.add(col, self.message(col, "min_length", default));
                }
            }
        }
        if let Some(ref pattern) = rule.pattern {
            match Regex::new(pattern) {
                Ok(re) => {
                    if let Some(s) = v.as_str() {
                        if !re.is_match(s) {
                            let default = format!("{} does not match required pattern", col);
                            errors.add(col, self.message(col, "pattern", default));
                        }
                    }
                }
                Err(_) => errors.add(col, format!("invalid pattern for {}", col)),
            }
        }
        if let Some(ref allowed) = rule.allowed {
            if !allowed.iter().any(|a| value_eq(v, a)) {
                let default = format!(
                    "{} must be one of: {:?}",
                    col,
                    allowed.iter().take(5).collect::<Vec<_>>()
                );
                errors.add(col, self.message(col, "allowed", default));
            }
        }
        if let Some(min) = rule.minimum {
            if let Some(n) = as_number(v) {
                if n < min {
                    let default = format!("{} must be at least {}", col, min);
                    errors.add(col, self.message(col, "minimum", default));
                }
            }
        }
        if let Some(max) = rule.maximum {
            if let Some(n) = as_number(v) {
                if n > max {
                    let default = format!("{} must be at most {}", col, max);
                    errors.add(col, self.message(col, "maximum", default));
                }
            }
        }
    }
}

fn finish(errors: ValidationErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        _ => false,
    }
}

/// Form fields arrive as text, so numeric rules also read numeric strings.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Option<String> {
    let s = v.as_str()?;
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s.len() >= 3
                && s.split_once('@')
                    .map_or(false, |(local, domain)| !local.is_empty() && !domain.is_empty());
            (!valid).then(|| format!("{} must be a valid email", col))
        }
        "uuid" => uuid::Uuid::parse_str(s)
            .is_err()
            .then(|| format!("{} must be a valid UUID", col)),
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .is_err()
            .then(|| format!("{} must be a valid date", col)),
        _ => None,
    }
}
