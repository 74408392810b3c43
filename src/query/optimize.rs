//! Filter normalization
//!
//! Semantically identical queries must produce identical payloads so that
//! they share a cache fingerprint. Optimization prunes empty groups,
//! collapses single-child groups and can optionally merge sibling
//! conditions on the same field.

use super::filter::{Condition, Filter, FilterValue, Operator, Scalar};
use super::Payload;

/// Sanitize and simplify a query payload.
///
/// Drops a search `query` without a value, optimizes the main filter and
/// each facet filter and removes the ones that end up empty.
pub fn sanitize_payload(mut payload: Payload, combine: bool) -> Payload {
    if payload
        .query
        .as_ref()
        .is_some_and(|query| query.is_empty())
    {
        payload.query = None;
    }

    payload.filter = payload
        .filter
        .take()
        .and_then(|filter| optimize_filter(filter, combine));

    for facet in &mut payload.facets {
        facet.filter = facet
            .filter
            .take()
            .and_then(|filter| optimize_filter(filter, combine));
    }

    payload
}

/// Optimize a filter, removing unnecessary nested conditions.
///
/// Returns `None` when nothing is left of the filter.
pub fn optimize_filter(filter: Filter, combine: bool) -> Option<Filter> {
    let mut group = match filter {
        Filter::Condition(condition) => return Some(Filter::Condition(condition)),
        Filter::Group(group) => group,
    };

    let mut conditions: Vec<Filter> = group
        .conditions
        .into_iter()
        .filter_map(|condition| optimize_filter(condition, combine))
        .collect();

    if conditions.is_empty() {
        return None;
    }

    if combine {
        conditions = combine_conditions(conditions, group.operator.unwrap_or_default());
    }

    if conditions.len() == 1 {
        let mut single = conditions.pop()?;
        // Negation is carried one level down only.
        if group.negate {
            single.set_negate(true);
        }
        return Some(single);
    }

    group.conditions = conditions;
    Some(Filter::Group(group))
}

/// Combine simple sibling conditions to shorten a filter.
///
/// Leaf conditions on the same field, without negation and without an
/// operator differing from `operator`, have their values merged. Nested
/// groups are combined recursively using their own operator. Existence
/// checks, ranges, negated conditions and conditions with a different
/// operator are kept as they are. Merged conditions come after the
/// untouched ones, in order of first appearance.
pub fn combine_conditions(conditions: Vec<Filter>, operator: Operator) -> Vec<Filter> {
    let mut merged: Vec<(String, Vec<Scalar>)> = Vec::new();
    let mut result = Vec::with_capacity(conditions.len());

    for condition in conditions {
        let condition = match condition {
            Filter::Group(mut group) => {
                if !group.conditions.is_empty() {
                    let nested_operator = group.operator.unwrap_or_default();
                    group.conditions = combine_conditions(group.conditions, nested_operator);
                }
                result.push(Filter::Group(group));
                continue;
            }
            Filter::Condition(condition) => condition,
        };

        let passthrough = condition.negate
            || condition.operator.is_some_and(|op| op != operator)
            || matches!(condition.value, None | Some(FilterValue::Range(_)));
        if passthrough {
            result.push(Filter::Condition(condition));
            continue;
        }

        let Condition { field, value, .. } = condition;
        let values = match value {
            Some(FilterValue::List(items)) => items,
            Some(FilterValue::Scalar(item)) => vec![item],
            _ => Vec::new(),
        };

        match merged.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => existing.extend(values),
            None => merged.push((field, values)),
        }
    }

    for (field, values) in merged {
        let mut unique: Vec<Scalar> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }

        let condition = if unique.len() == 1 {
            let value = unique.pop().map(FilterValue::Scalar);
            Condition {
                field,
                value,
                operator: None,
                negate: false,
            }
        } else {
            Condition {
                field,
                value: Some(FilterValue::List(unique)),
                operator: Some(operator),
                negate: false,
            }
        };
        result.push(Filter::Condition(condition));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::Group;
    use serde_json::json;

    fn filter(value: serde_json::Value) -> Filter {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_leaf_condition_is_untouched() {
        let leaf = filter(json!({"field": "id", "value": 1}));
        assert_eq!(optimize_filter(leaf.clone(), false), Some(leaf));
    }

    #[test]
    fn test_empty_group_is_pruned() {
        let empty = filter(json!({
            "operator": "AND",
            "conditions": [{"operator": "OR", "conditions": []}]
        }));
        assert_eq!(optimize_filter(empty, false), None);
    }

    #[test]
    fn test_single_child_collapses_with_negation() {
        let group = filter(json!({
            "operator": "and",
            "negate": true,
            "conditions": [{"field": "source.id", "value": 1503}]
        }));
        let optimized = optimize_filter(group, false).unwrap();
        assert_eq!(
            serde_json::to_value(&optimized).unwrap(),
            json!({"field": "source.id", "value": 1503, "negate": true})
        );
    }

    #[test]
    fn test_negation_propagates_one_level_only() {
        let group = filter(json!({
            "negate": true,
            "conditions": [{
                "operator": "OR",
                "conditions": [
                    {"field": "a", "value": 1},
                    {"field": "b", "value": 2}
                ]
            }]
        }));
        let Some(Filter::Group(inner)) = optimize_filter(group, false) else {
            panic!("expected inner group");
        };
        assert!(inner.negate);
        assert!(inner.conditions.iter().all(|c| !c.negate()));
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let tree = filter(json!({
            "operator": "or",
            "conditions": [
                {"conditions": []},
                {"negate": true, "conditions": [{"field": "x", "value": [1, 2]}]},
                {"operator": "AND", "conditions": [
                    {"field": "y", "value": 1},
                    {"field": "y", "value": 2},
                    {"conditions": [{"field": "z"}]}
                ]},
                {"field": "date", "value": {"to": "2024-01-01"}}
            ]
        }));

        for combine in [false, true] {
            let once = optimize_filter(tree.clone(), combine);
            let twice = once.clone().and_then(|f| optimize_filter(f, combine));
            assert_eq!(once, twice, "combine = {combine}");
        }
    }

    #[test]
    fn test_combine_merges_same_field() {
        let conditions = vec![
            Filter::from(Condition::new("id", Scalar::Int(1))),
            Filter::from(Condition::new("id", Scalar::Int(2))),
        ];
        let combined = combine_conditions(conditions, Operator::And);
        assert_eq!(combined.len(), 1);
        assert_eq!(
            serde_json::to_value(&combined[0]).unwrap(),
            json!({"field": "id", "value": [1, 2], "operator": "AND"})
        );
    }

    #[test]
    fn test_combine_single_value_becomes_scalar() {
        let conditions = vec![
            Filter::from(Condition::new("id", Scalar::Int(7))),
            Filter::from(Condition::new("id", vec![Scalar::Int(7)])),
            Filter::from(Condition::new("name", Scalar::from("flood"))),
        ];
        let combined = combine_conditions(conditions, Operator::Or);
        assert_eq!(
            serde_json::to_value(&combined).unwrap(),
            json!([
                {"field": "id", "value": 7},
                {"field": "name", "value": "flood"}
            ])
        );
    }

    #[test]
    fn test_combine_keeps_special_conditions() {
        let conditions = vec![
            Filter::from(Condition::exists("image")),
            Filter::from(Condition::new("id", Scalar::Int(1)).negated()),
            Filter::from(Condition::new("id", Scalar::Int(2)).with_operator(Operator::Or)),
            Filter::from(Condition::new("id", Scalar::Int(3)).with_operator(Operator::And)),
        ];
        let combined = combine_conditions(conditions.clone(), Operator::And);
        assert_eq!(combined.len(), 4);
        assert_eq!(&combined[..3], &conditions[..3]);
        assert_eq!(
            serde_json::to_value(&combined[3]).unwrap(),
            json!({"field": "id", "value": 3})
        );
    }

    #[test]
    fn test_combine_recurses_with_nested_operator() {
        let nested = Group::new(
            Operator::Or,
            vec![
                Condition::new("theme.id", Scalar::Int(4)).into(),
                Condition::new("theme.id", Scalar::Int(5)).into(),
            ],
        );
        let combined = combine_conditions(vec![nested.into()], Operator::And);
        let Filter::Group(group) = &combined[0] else {
            panic!("expected group");
        };
        assert_eq!(
            serde_json::to_value(&group.conditions).unwrap(),
            json!([{"field": "theme.id", "value": [4, 5], "operator": "OR"}])
        );
    }

    #[test]
    fn test_sanitize_drops_empty_parts() {
        let payload: Payload = serde_json::from_value(json!({
            "query": {"value": "", "fields": ["title"]},
            "filter": {"conditions": [{"conditions": []}]},
            "facets": [{"field": "country", "filter": {"conditions": []}}],
            "limit": 10
        }))
        .unwrap();

        let sanitized = sanitize_payload(payload, false);
        assert_eq!(
            serde_json::to_value(&sanitized).unwrap(),
            json!({"facets": [{"field": "country"}], "limit": 10})
        );
    }
}
