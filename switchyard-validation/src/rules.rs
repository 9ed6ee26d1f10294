//! Declarative per-field rules.
//!
//! A [`RuleSet`] lists fields by dotted path together with the rules that
//! apply to them. Values are checked through their `serde_json`
//! representation, so any `Serialize` type can be validated.
//!
//! ```
//! use switchyard_validation::{FieldRules, Rule, RuleSet};
//!
//! let rules = RuleSet::new()
//!     .field(FieldRules::parse("name", "required,min=2,max=64").unwrap())
//!     .field(FieldRules::new("email").rule(Rule::Required).rule(Rule::Email));
//!
//! let errors = rules
//!     .validate(&serde_json::json!({ "name": "", "email": "nope" }))
//!     .unwrap_err();
//!
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors.errors[0].rule, "required");
//! assert_eq!(errors.errors[1].rule, "email");
//! ```
//!
//! Evaluation never stops at the first violation: every field is checked
//! and every failing rule is reported, with two exceptions per field:
//!
//! - when `required` fails, the remaining rules of that field are skipped;
//! - an absent or `null` field without `required` is not checked at all.

use crate::validators;
use crate::{RuleParseError, ValidationError, ValidationErrors};
use serde::Serialize;
use serde_json::Value;

/// A single constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Present, not `null`, not a blank string, not an empty array or object.
    Required,
    /// Numbers: value >= n. Strings: at least n characters. Arrays/objects: at least n entries.
    Min(f64),
    /// Numbers: value <= n. Strings: at most n characters. Arrays/objects: at most n entries.
    Max(f64),
    /// Exactly n characters (strings) or entries (arrays/objects).
    Len(usize),
    Email,
    Url,
    Uuid,
    Alpha,
    Alphanum,
    /// Numeric string, or a JSON number.
    Numeric,
    /// One of the listed values (compared as text).
    OneOf(Vec<String>),
}

impl Rule {
    /// Tag name, also used as the `rule` of a violation.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Len(_) => "len",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Uuid => "uuid",
            Rule::Alpha => "alpha",
            Rule::Alphanum => "alphanum",
            Rule::Numeric => "numeric",
            Rule::OneOf(_) => "oneof",
        }
    }

    /// Parse one tag such as `min=2` or `oneof=red green blue`.
    pub fn parse(tag: &str) -> Result<Self, RuleParseError> {
        let (name, arg) = match tag.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (tag.trim(), None),
        };

        let require_arg = || {
            arg.filter(|a| !a.is_empty())
                .ok_or_else(|| RuleParseError::MissingArgument(name.to_string()))
        };
        let invalid = |value: &str| RuleParseError::InvalidArgument {
            rule: name.to_string(),
            value: value.to_string(),
        };

        // NaN and infinite bounds never compare as violated
        let bound = |a: &str| {
            a.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| invalid(a))
        };

        let rule = match name {
            "required" => Rule::Required,
            "min" => Rule::Min(bound(require_arg()?)?),
            "max" => Rule::Max(bound(require_arg()?)?),
            "len" => {
                let a = require_arg()?;
                Rule::Len(a.parse().map_err(|_| invalid(a))?)
            }
            "email" => Rule::Email,
            "url" => Rule::Url,
            "uuid" => Rule::Uuid,
            "alpha" => Rule::Alpha,
            "alphanum" => Rule::Alphanum,
            "numeric" => Rule::Numeric,
            "oneof" => Rule::OneOf(
                require_arg()?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            other => return Err(RuleParseError::UnknownRule(other.to_string())),
        };

        Ok(rule)
    }

    /// Check a present, non-null value.
    fn check(&self, field: &str, value: &Value) -> Option<ValidationError> {
        let violation = |message: String| Some(ValidationError::new(field, self.name(), message));

        match self {
            Rule::Required => {
                if is_blank(value) {
                    violation(format!("{} is required", field))
                } else {
                    None
                }
            }
            Rule::Min(min) => match measure(value) {
                Some(Measure::Number(n)) if n < *min => {
                    violation(format!("{} must be at least {}", field, min))
                }
                Some(Measure::Length(len)) if (len as f64) < *min => {
                    violation(format!("{} must have at least {} {}", field, min, unit(value)))
                }
                _ => None,
            },
            Rule::Max(max) => match measure(value) {
                Some(Measure::Number(n)) if n > *max => {
                    violation(format!("{} must be at most {}", field, max))
                }
                Some(Measure::Length(len)) if (len as f64) > *max => {
                    violation(format!("{} must have at most {} {}", field, max, unit(value)))
                }
                _ => None,
            },
            Rule::Len(expected) => match measure(value) {
                Some(Measure::Length(len)) if len != *expected => violation(format!(
                    "{} must have exactly {} {}",
                    field,
                    expected,
                    unit(value)
                )),
                _ => None,
            },
            Rule::Email => check_str(value, validators::is_email)
                .then(|| format!("{} must be a valid email address", field))
                .and_then(violation),
            Rule::Url => check_str(value, validators::is_url)
                .then(|| format!("{} must be a valid URL", field))
                .and_then(violation),
            Rule::Uuid => check_str(value, validators::is_uuid)
                .then(|| format!("{} must be a valid UUID", field))
                .and_then(violation),
            Rule::Alpha => check_str(value, validators::is_alpha)
                .then(|| format!("{} must contain only letters", field))
                .and_then(violation),
            Rule::Alphanum => check_str(value, validators::is_alphanumeric)
                .then(|| format!("{} must contain only letters and digits", field))
                .and_then(violation),
            Rule::Numeric => {
                let ok = value.is_number() || value.as_str().is_some_and(validators::is_numeric);
                (!ok)
                    .then(|| format!("{} must be numeric", field))
                    .and_then(violation)
            }
            Rule::OneOf(allowed) => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => String::new(),
                };
                if allowed.iter().any(|a| *a == text) {
                    None
                } else {
                    violation(format!("{} must be one of [{}]", field, allowed.join(", ")))
                }
            }
        }
    }
}

/// True when `value` fails the format check (non-strings always fail).
fn check_str(value: &Value, is_valid: fn(&str) -> bool) -> bool {
    !value.as_str().is_some_and(is_valid)
}

enum Measure {
    Number(f64),
    Length(usize),
}

fn measure(value: &Value) -> Option<Measure> {
    match value {
        Value::Number(n) => n.as_f64().map(Measure::Number),
        Value::String(s) => Some(Measure::Length(s.chars().count())),
        Value::Array(items) => Some(Measure::Length(items.len())),
        Value::Object(map) => Some(Measure::Length(map.len())),
        _ => None,
    }
}

fn unit(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "characters",
        _ => "items",
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Resolve a dotted path (`address.city`, `tags.0`) inside `root`.
fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Rules for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRules {
    field: String,
    rules: Vec<Rule>,
}

impl FieldRules {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rules: Vec::new(),
        }
    }

    /// Build from a comma separated tag string, e.g. `"required,min=2,email"`.
    pub fn parse(field: impl Into<String>, tags: &str) -> Result<Self, RuleParseError> {
        let rules = tags
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(Rule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            field: field.into(),
            rules,
        })
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&Rule::Required)
    }

    fn check(&self, root: &Value, errors: &mut ValidationErrors) {
        let value = lookup(root, &self.field).filter(|v| !v.is_null());

        let Some(value) = value else {
            if self.is_required() {
                errors.add(ValidationError::new(
                    &self.field,
                    Rule::Required.name(),
                    format!("{} is required", self.field),
                ));
            }
            return;
        };

        if self.is_required() {
            if let Some(violation) = Rule::Required.check(&self.field, value) {
                errors.add(violation);
                return;
            }
        }

        for rule in self.rules.iter().filter(|r| **r != Rule::Required) {
            if let Some(violation) = rule.check(&self.field, value) {
                errors.add(violation);
            }
        }
    }
}

/// Ordered collection of [`FieldRules`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rules: FieldRules) -> Self {
        self.fields.push(rules);
        self
    }

    /// Shorthand for `field(FieldRules::parse(name, tags)?)`.
    pub fn tags(self, field: impl Into<String>, tags: &str) -> Result<Self, RuleParseError> {
        Ok(self.field(FieldRules::parse(field, tags)?))
    }

    pub fn fields(&self) -> &[FieldRules] {
        &self.fields
    }

    /// Check a serializable value against every field.
    pub fn validate<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ValidationErrors> {
        match serde_json::to_value(value) {
            Ok(json) => self.validate_value(&json),
            Err(e) => Err(ValidationErrors::new(vec![ValidationError::new(
                "",
                "serialize",
                format!("value could not be inspected: {}", e),
            )])),
        }
    }

    pub fn validate_value(&self, value: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for field in &self.fields {
            field.check(value, &mut errors);
        }
        errors.into_result()
    }
}
