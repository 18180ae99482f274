//! Default value legality.
//!
//! A `@default` value must fit the kind of the shape it defaults: booleans
//! for booleans, in-range numbers for numbers, strings for strings, and only
//! empty lists and maps. Structures and unions take no default. Constraint
//! traits (`@range`, `@length`, `@pattern`) on the member or its target also
//! apply, except that a zero value is always admitted.

use regex::Regex;
use serde_json::Value;
use tessel_core::traits::{ids, TraitMap};
use tessel_core::{Model, ModelError, Shape, ShapeKind};
use tracing::warn;

/// Check every root-level and member-level default in the model.
pub fn check_defaults(model: &Model) -> Vec<ModelError> {
    let mut errors = Vec::new();
    for shape in model.shapes() {
        if let Some(value) = shape.get_trait(&ids::default()) {
            if let Err(reason) = check_value(shape, value, &[shape.traits()]) {
                errors.push(ModelError::InvalidDefaultValue {
                    id: shape.id().clone(),
                    reason,
                });
            }
        }
        for member in shape.members() {
            errors.extend(check_member(model, member));
        }
    }
    errors
}

fn check_member(model: &Model, member: &Shape) -> Option<ModelError> {
    let value = member.get_trait(&ids::default())?;
    let target = model.member_target(member)?;
    // null removes an inherited default.
    if value.is_null() {
        return None;
    }
    if let Err(reason) = check_value(target, value, &[member.traits(), target.traits()]) {
        return Some(ModelError::InvalidDefaultValue {
            id: member.id().clone(),
            reason,
        });
    }
    match target.get_trait(&ids::default()) {
        Some(expected) if !expected.is_null() && expected != value => {
            Some(ModelError::DefaultValueMismatch {
                id: member.id().clone(),
                expected: expected.to_string(),
                found: value.to_string(),
            })
        }
        _ => None,
    }
}

/// Check `value` as a default for `target`, with `constraints` holding the
/// trait maps whose constraint traits apply.
pub fn check_value(
    target: &Shape,
    value: &Value,
    constraints: &[&TraitMap],
) -> Result<(), String> {
    let kind = target.kind();
    match kind {
        ShapeKind::Boolean => expect(value.is_boolean(), "a boolean", value),
        ShapeKind::String => {
            let text = value.as_str().ok_or_else(|| mismatch("a string", value))?;
            if text.is_empty() {
                return Ok(());
            }
            check_length(text.chars().count(), constraints)?;
            check_pattern(text, constraints)
        }
        ShapeKind::Blob => {
            let text = value.as_str().ok_or_else(|| mismatch("a string", value))?;
            if text.is_empty() {
                return Ok(());
            }
            check_length(text.len(), constraints)
        }
        ShapeKind::Timestamp => expect(value.is_string() || value.is_number(), "a timestamp", value),
        ShapeKind::Document => Ok(()),
        ShapeKind::Enum => {
            let text = value.as_str().ok_or_else(|| mismatch("a string", value))?;
            let allowed = enum_values(target);
            if allowed.iter().any(|v| v.as_str() == Some(text)) {
                Ok(())
            } else {
                Err(format!("`{text}` is not a value of enum `{}`", target.id()))
            }
        }
        ShapeKind::IntEnum => {
            let number = value.as_i64().ok_or_else(|| mismatch("an integer", value))?;
            let allowed = enum_values(target);
            if allowed.iter().any(|v| v.as_i64() == Some(number)) {
                Ok(())
            } else {
                Err(format!("{number} is not a value of intEnum `{}`", target.id()))
            }
        }
        ShapeKind::Byte | ShapeKind::Short | ShapeKind::Integer | ShapeKind::Long => {
            let number = value.as_i64().ok_or_else(|| mismatch("an integer", value))?;
            if let Some((min, max)) = kind.integer_bounds() {
                if number < min || number > max {
                    return Err(format!("{number} does not fit in a {kind}"));
                }
            }
            check_range(number as f64, constraints)
        }
        ShapeKind::BigInteger => {
            let number = value.as_f64().ok_or_else(|| mismatch("an integer", value))?;
            if number.fract() != 0.0 {
                return Err(mismatch("an integer", value));
            }
            check_range(number, constraints)
        }
        ShapeKind::Float | ShapeKind::Double | ShapeKind::BigDecimal => {
            let number = value.as_f64().ok_or_else(|| mismatch("a number", value))?;
            check_range(number, constraints)
        }
        ShapeKind::List => match value.as_array() {
            Some(items) if items.is_empty() => Ok(()),
            _ => Err(format!("list defaults must be an empty list, found {value}")),
        },
        ShapeKind::Map => match value.as_object() {
            Some(entries) if entries.is_empty() => Ok(()),
            _ => Err(format!("map defaults must be an empty map, found {value}")),
        },
        ShapeKind::Structure
        | ShapeKind::Union
        | ShapeKind::Service
        | ShapeKind::Operation
        | ShapeKind::Resource
        | ShapeKind::Member => Err(format!("{kind} shapes cannot have a default value")),
    }
}

fn expect(ok: bool, expected: &str, value: &Value) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(mismatch(expected, value))
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, found {value}")
}

/// Values of an enum or intEnum, taken from `@enumValue` or the member name.
fn enum_values(target: &Shape) -> Vec<Value> {
    target
        .members()
        .iter()
        .filter_map(|member| {
            member
                .get_trait(&ids::enum_value())
                .cloned()
                .or_else(|| member.member_name().map(|n| Value::String(n.to_string())))
        })
        .collect()
}

fn bound(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn check_range(number: f64, constraints: &[&TraitMap]) -> Result<(), String> {
    if number == 0.0 {
        return Ok(());
    }
    for range in constraints.iter().filter_map(|t| t.get(&ids::range())) {
        if let Some(min) = bound(range, "min").filter(|min| number < *min) {
            return Err(format!("{number} is less than the @range minimum of {min}"));
        }
        if let Some(max) = bound(range, "max").filter(|max| number > *max) {
            return Err(format!("{number} is greater than the @range maximum of {max}"));
        }
    }
    Ok(())
}

fn check_length(len: usize, constraints: &[&TraitMap]) -> Result<(), String> {
    let len = len as f64;
    for length in constraints.iter().filter_map(|t| t.get(&ids::length())) {
        if let Some(min) = bound(length, "min").filter(|min| len < *min) {
            return Err(format!("length {len} is less than the @length minimum of {min}"));
        }
        if let Some(max) = bound(length, "max").filter(|max| len > *max) {
            return Err(format!("length {len} is greater than the @length maximum of {max}"));
        }
    }
    Ok(())
}

fn check_pattern(text: &str, constraints: &[&TraitMap]) -> Result<(), String> {
    for pattern in constraints
        .iter()
        .filter_map(|t| t.get(&ids::pattern()))
        .filter_map(Value::as_str)
    {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(text) => {}
            Ok(_) => return Err(format!("`{text}` does not match @pattern `{pattern}`")),
            Err(err) => warn!(%pattern, error = %err, "skipping unparseable @pattern"),
        }
    }
    Ok(())
}
