//! Declarative field-constraint validation.
//!
//! Each route declares a [`Schema`]: per field a semantic kind, whether it is
//! required, an optional default, and constraints. Validation is total - it
//! walks every declared field and collects every violation instead of
//! stopping at the first one. Unknown input fields are ignored for forward
//! compatibility. Numeric strings (query parameters) are coerced before
//! range checks; a failed coercion is a field issue, never a panic.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::FieldIssue;

/// A coerced, constraint-checked value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// (latitude, longitude)
    Coord(f64, f64),
    List(Vec<FieldValue>),
}

/// The semantic kind of a field, with its constraints.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Str {
        max_len: Option<usize>,
        pattern: Option<Regex>,
    },
    Int {
        /// Values below `floor` are raised to it (e.g. `page >= 1`).
        floor: Option<i64>,
        /// Values below `min` are rejected.
        min: Option<i64>,
        /// Values above `max` are rejected, not clamped.
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Bool,
    Enum {
        allowed: &'static [&'static str],
    },
    /// A latitude/longitude pair, accepted as `"lat,lon"` or `[lat, lon]`.
    Coord,
    Array {
        element: Box<FieldKind>,
        max_items: Option<usize>,
    },
}

impl FieldKind {
    pub fn str() -> Self {
        FieldKind::Str { max_len: None, pattern: None }
    }

    pub fn str_max(max_len: usize) -> Self {
        FieldKind::Str { max_len: Some(max_len), pattern: None }
    }

    pub fn str_pattern(max_len: usize, pattern: Regex) -> Self {
        FieldKind::Str { max_len: Some(max_len), pattern: Some(pattern) }
    }

    pub fn int() -> Self {
        FieldKind::Int { floor: None, min: None, max: None }
    }

    pub fn int_min(min: i64) -> Self {
        FieldKind::Int { floor: None, min: Some(min), max: None }
    }

    pub fn int_range(min: i64, max: i64) -> Self {
        FieldKind::Int { floor: None, min: Some(min), max: Some(max) }
    }

    /// Integer floored to `floor`, rejected above `max`. Used for pagination.
    pub fn int_floored(floor: i64, max: Option<i64>) -> Self {
        FieldKind::Int { floor: Some(floor), min: None, max }
    }
}

/// One declared field of a schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false, default: None }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }
}

/// The typed payload produced by successful validation: every declared field
/// that was present (or defaulted), coerced and within constraints.
#[derive(Debug, Clone, Default)]
pub struct ValidatedPayload {
    values: BTreeMap<&'static str, FieldValue>,
}

impl ValidatedPayload {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(FieldValue::Float(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(FieldValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_coord(&self, name: &str) -> Option<(f64, f64)> {
        match self.values.get(name) {
            Some(FieldValue::Coord(lat, lon)) => Some((*lat, *lon)),
            _ => None,
        }
    }

    pub fn get_str_list(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name) {
            Some(FieldValue::List(items)) => Some(
                items
                    .iter()
                    .filter_map(|v| match v {
                        FieldValue::Str(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// A route's declarative validation schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A schema that declares nothing; validation always succeeds with an
    /// empty payload.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Validates raw input against the schema.
    ///
    /// Returns the typed payload, or every violated field at once.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ValidatedPayload, Vec<FieldIssue>> {
        let mut payload = ValidatedPayload::default();
        let mut issues: Vec<FieldIssue> = Vec::new();

        for spec in &self.fields {
            match raw.get(spec.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &spec.default {
                        payload.values.insert(spec.name, default.clone());
                    } else if spec.required {
                        issues.push(FieldIssue::new(spec.name, "is required"));
                    }
                }
                Some(value) => match coerce(spec.name, &spec.kind, value, &mut issues) {
                    Some(coerced) => {
                        payload.values.insert(spec.name, coerced);
                    }
                    None => {
                        // coerce already recorded the issue(s)
                    }
                },
            }
        }

        if issues.is_empty() {
            Ok(payload)
        } else {
            Err(issues)
        }
    }
}

/// Coerces one raw value to its declared kind and checks constraints.
/// Records issues under `field` and returns `None` when the value is unusable.
fn coerce(
    field: &str,
    kind: &FieldKind,
    value: &Value,
    issues: &mut Vec<FieldIssue>,
) -> Option<FieldValue> {
    match kind {
        FieldKind::Str { max_len, pattern } => {
            let s = match value {
                Value::String(s) => s.clone(),
                _ => {
                    issues.push(FieldIssue::new(field, "must be a string"));
                    return None;
                }
            };
            if let Some(max) = max_len {
                if s.chars().count() > *max {
                    issues.push(FieldIssue::new(field, format!("must be at most {} characters", max)));
                    return None;
                }
            }
            if let Some(re) = pattern {
                if !re.is_match(&s) {
                    issues.push(FieldIssue::new(field, "has an invalid format"));
                    return None;
                }
            }
            Some(FieldValue::Str(s))
        }
        FieldKind::Int { floor, min, max } => {
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            let Some(mut v) = parsed else {
                issues.push(FieldIssue::new(field, "must be an integer"));
                return None;
            };
            if let Some(fl) = floor {
                if v < *fl {
                    v = *fl;
                }
            }
            if let Some(mn) = min {
                if v < *mn {
                    issues.push(FieldIssue::new(field, format!("must be >= {}", mn)));
                    return None;
                }
            }
            if let Some(mx) = max {
                if v > *mx {
                    issues.push(FieldIssue::new(field, format!("must be <= {}", mx)));
                    return None;
                }
            }
            Some(FieldValue::Int(v))
        }
        FieldKind::Float { min, max } => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let Some(v) = parsed else {
                issues.push(FieldIssue::new(field, "must be a number"));
                return None;
            };
            // String input can smuggle in NaN/inf, which no range check catches.
            if !v.is_finite() {
                issues.push(FieldIssue::new(field, "must be a finite number"));
                return None;
            }
            if let Some(mn) = min {
                if v < *mn {
                    issues.push(FieldIssue::new(field, format!("must be >= {}", mn)));
                    return None;
                }
            }
            if let Some(mx) = max {
                if v > *mx {
                    issues.push(FieldIssue::new(field, format!("must be <= {}", mx)));
                    return None;
                }
            }
            Some(FieldValue::Float(v))
        }
        FieldKind::Bool => match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::String(s) if s == "true" || s == "false" => Some(FieldValue::Bool(s == "true")),
            _ => {
                issues.push(FieldIssue::new(field, "must be a boolean"));
                None
            }
        },
        FieldKind::Enum { allowed } => {
            let s = match value {
                Value::String(s) => s.as_str(),
                _ => {
                    issues.push(FieldIssue::new(field, "must be a string"));
                    return None;
                }
            };
            if allowed.contains(&s) {
                Some(FieldValue::Str(s.to_string()))
            } else {
                issues.push(FieldIssue::new(field, format!("must be one of: {}", allowed.join(", "))));
                None
            }
        }
        FieldKind::Coord => {
            let pair = match value {
                Value::String(s) => {
                    let mut parts = s.splitn(2, ',');
                    let lat = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
                    let lon = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
                    lat.zip(lon)
                }
                Value::Array(items) if items.len() == 2 => {
                    items[0].as_f64().zip(items[1].as_f64())
                }
                _ => None,
            };
            let Some((lat, lon)) = pair else {
                issues.push(FieldIssue::new(field, "must be a \"lat,lon\" coordinate pair"));
                return None;
            };
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                issues.push(FieldIssue::new(field, "coordinates out of range"));
                return None;
            }
            Some(FieldValue::Coord(lat, lon))
        }
        FieldKind::Array { element, max_items } => {
            let items = match value {
                Value::Array(items) => items,
                _ => {
                    issues.push(FieldIssue::new(field, "must be an array"));
                    return None;
                }
            };
            if let Some(max) = max_items {
                if items.len() > *max {
                    issues.push(FieldIssue::new(field, format!("must have at most {} items", max)));
                    return None;
                }
            }
            let before = issues.len();
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let elem_field = format!("{}[{}]", field, i);
                if let Some(coerced) = coerce(&elem_field, element, item, issues) {
                    out.push(coerced);
                }
            }
            if issues.len() > before {
                return None;
            }
            Some(FieldValue::List(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn listing_query_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::new("city", FieldKind::str_max(80)),
            FieldSpec::new("minPrice", FieldKind::int_min(0)),
            FieldSpec::new("maxPrice", FieldKind::int_min(0)),
            FieldSpec::new("bedrooms", FieldKind::int_range(1, 16)),
            FieldSpec::new("page", FieldKind::int_floored(1, None)).default_value(FieldValue::Int(1)),
            FieldSpec::new("limit", FieldKind::int_floored(1, Some(100)))
                .default_value(FieldValue::Int(20)),
        ])
    }

    #[test]
    fn coerces_numeric_strings() {
        let payload =
            listing_query_schema().validate(&raw(json!({"minPrice": "1000000"}))).unwrap();
        assert_eq!(payload.get_i64("minPrice"), Some(1_000_000));
    }

    #[test]
    fn coercion_failure_is_a_field_issue_not_a_crash() {
        let issues = listing_query_schema().validate(&raw(json!({"minPrice": "abc"}))).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "minPrice");
    }

    #[test]
    fn page_zero_is_floored_to_one() {
        let payload = listing_query_schema().validate(&raw(json!({"page": "0"}))).unwrap();
        assert_eq!(payload.get_i64("page"), Some(1));
    }

    #[test]
    fn pagination_defaults_apply_when_absent() {
        let payload = listing_query_schema().validate(&raw(json!({}))).unwrap();
        assert_eq!(payload.get_i64("page"), Some(1));
        assert_eq!(payload.get_i64("limit"), Some(20));
    }

    #[test]
    fn limit_above_declared_max_is_rejected_not_clamped() {
        let issues = listing_query_schema().validate(&raw(json!({"limit": "5000"}))).unwrap_err();
        assert_eq!(issues[0].field, "limit");
    }

    #[test]
    fn collects_every_violation() {
        let issues = listing_query_schema()
            .validate(&raw(json!({"minPrice": "abc", "bedrooms": 99})))
            .unwrap_err();
        assert_eq!(issues.len(), 2);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"minPrice"));
        assert!(fields.contains(&"bedrooms"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload = listing_query_schema()
            .validate(&raw(json!({"city": "Pune", "debug": "1", "x": "y"})))
            .unwrap();
        assert_eq!(payload.get_str("city"), Some("Pune"));
        assert!(payload.get("debug").is_none());
    }

    #[test]
    fn required_field_missing() {
        let schema =
            Schema::new(vec![FieldSpec::new("title", FieldKind::str_max(140)).required()]);
        let issues = schema.validate(&raw(json!({}))).unwrap_err();
        assert_eq!(issues[0].field, "title");
        assert_eq!(issues[0].issue, "is required");
    }

    #[test]
    fn enum_membership() {
        let schema = Schema::new(vec![FieldSpec::new(
            "propertyType",
            FieldKind::Enum { allowed: &["apartment", "villa", "plot", "office"] },
        )]);
        assert!(schema.validate(&raw(json!({"propertyType": "villa"}))).is_ok());
        let issues = schema.validate(&raw(json!({"propertyType": "castle"}))).unwrap_err();
        assert_eq!(issues[0].field, "propertyType");
    }

    #[test]
    fn coordinate_pair_parsing_and_range() {
        let schema = Schema::new(vec![FieldSpec::new("location", FieldKind::Coord)]);
        let payload = schema.validate(&raw(json!({"location": "19.076, 72.8777"}))).unwrap();
        let (lat, lon) = payload.get_coord("location").unwrap();
        assert!((lat - 19.076).abs() < 1e-9);
        assert!((lon - 72.8777).abs() < 1e-9);

        assert!(schema.validate(&raw(json!({"location": [19.076, 72.8777]}))).is_ok());
        assert!(schema.validate(&raw(json!({"location": "200,0"}))).is_err());
        assert!(schema.validate(&raw(json!({"location": "not-a-pair"}))).is_err());
    }

    #[test]
    fn array_elements_validated_individually() {
        let schema = Schema::new(vec![FieldSpec::new(
            "amenities",
            FieldKind::Array { element: Box::new(FieldKind::str_max(40)), max_items: Some(3) },
        )]);
        assert!(schema.validate(&raw(json!({"amenities": ["lift", "gym"]}))).is_ok());

        let issues = schema.validate(&raw(json!({"amenities": ["lift", 7]}))).unwrap_err();
        assert_eq!(issues[0].field, "amenities[1]");

        let issues =
            schema.validate(&raw(json!({"amenities": ["a", "b", "c", "d"]}))).unwrap_err();
        assert_eq!(issues[0].field, "amenities");
    }

    #[test]
    fn float_rejects_non_finite_values() {
        let schema =
            Schema::new(vec![FieldSpec::new("score", FieldKind::Float { min: None, max: None })]);
        let payload = schema.validate(&raw(json!({"score": "1.5"}))).unwrap();
        assert_eq!(payload.get_f64("score"), Some(1.5));

        for bad in ["NaN", "inf", "-inf", "infinity"] {
            let issues = schema.validate(&raw(json!({ "score": bad }))).unwrap_err();
            assert_eq!(issues[0].field, "score", "accepted {}", bad);
        }
    }

    #[test]
    fn pattern_constraint() {
        let pincode = Regex::new(r"^[1-9][0-9]{5}$").unwrap();
        let schema =
            Schema::new(vec![FieldSpec::new("pincode", FieldKind::str_pattern(6, pincode))]);
        assert!(schema.validate(&raw(json!({"pincode": "400001"}))).is_ok());
        assert!(schema.validate(&raw(json!({"pincode": "0001"}))).is_err());
    }

    #[test]
    fn empty_schema_accepts_anything() {
        let payload = Schema::empty().validate(&raw(json!({"whatever": 1}))).unwrap();
        assert!(payload.get("whatever").is_none());
    }
}
