//! Filter tree accepted by the ReliefWeb API search endpoints.
//!
//! A filter is either a leaf [`Condition`] on a single field or a [`Group`]
//! joining nested filters with an operator. Groups are recognised by the
//! presence of a `conditions` key.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Boolean operator joining conditions or values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            other => Err(format!("unknown filter operator: {other}")),
        }
    }
}

// Operators are accepted in any case and normalized to upper-case.
impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Single filter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// Range bounds, either side may be open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Scalar>,
}

/// Value of a leaf condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Scalar>),
    Range(Range),
    Scalar(Scalar),
}

impl From<Scalar> for FilterValue {
    fn from(value: Scalar) -> Self {
        FilterValue::Scalar(value)
    }
}

impl From<Vec<Scalar>> for FilterValue {
    fn from(value: Vec<Scalar>) -> Self {
        FilterValue::List(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Scalar(value.into())
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(value: Vec<i64>) -> Self {
        FilterValue::List(value.into_iter().map(Scalar::Int).collect())
    }
}

/// Leaf condition on one field. A missing value is an existence check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub negate: bool,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            operator: None,
            negate: false,
        }
    }

    /// Condition matching documents where the field exists
    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            operator: None,
            negate: false,
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// Group of nested filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub conditions: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub negate: bool,
}

impl Group {
    pub fn new(operator: Operator, conditions: Vec<Filter>) -> Self {
        Self {
            conditions,
            operator: Some(operator),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }
}

/// Node of the filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Group(Group),
    Condition(Condition),
}

impl Filter {
    pub fn negate(&self) -> bool {
        match self {
            Filter::Group(group) => group.negate,
            Filter::Condition(condition) => condition.negate,
        }
    }

    pub fn set_negate(&mut self, negate: bool) {
        match self {
            Filter::Group(group) => group.negate = negate,
            Filter::Condition(condition) => condition.negate = negate,
        }
    }
}

impl From<Condition> for Filter {
    fn from(value: Condition) -> Self {
        Filter::Condition(value)
    }
}

impl From<Group> for Filter {
    fn from(value: Group) -> Self {
        Filter::Group(value)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_is_case_insensitive() {
        let group: Group = serde_json::from_value(json!({
            "operator": "or",
            "conditions": [{"field": "status", "value": "published"}]
        }))
        .unwrap();
        assert_eq!(group.operator, Some(Operator::Or));
        assert!(serde_json::from_value::<Operator>(json!("xor")).is_err());
    }

    #[test]
    fn test_untagged_filter_shapes() {
        let filter: Filter = serde_json::from_value(json!({
            "conditions": [
                {"field": "date.created", "value": {"from": "2024-01-01"}},
                {"field": "country.id", "value": [1, 2]},
                {"field": "image", "negate": true}
            ]
        }))
        .unwrap();

        let Filter::Group(group) = filter else {
            panic!("expected a group");
        };
        assert!(matches!(
            &group.conditions[0],
            Filter::Condition(Condition { value: Some(FilterValue::Range(_)), .. })
        ));
        assert!(matches!(
            &group.conditions[1],
            Filter::Condition(Condition { value: Some(FilterValue::List(_)), .. })
        ));
        assert!(matches!(
            &group.conditions[2],
            Filter::Condition(Condition { value: None, negate: true, .. })
        ));
    }

    #[test]
    fn test_serialization_skips_defaults() {
        let condition = Condition::new("id", Scalar::Int(3));
        assert_eq!(
            serde_json::to_value(&condition).unwrap(),
            json!({"field": "id", "value": 3})
        );
    }
}
