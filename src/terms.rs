//! Term lookups against the read API

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use crate::client::{ReliefWebApiClient, RequestOptions};
use crate::query::{Condition, Method, Payload, Query};

/// Terms to load for one field of a document
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    /// API resource holding the terms, e.g. `countries`
    pub resource: String,
    pub ids: Vec<i64>,
    /// Fields wanted on top of `id` and `name`
    pub fields: Vec<String>,
}

impl TermQuery {
    pub fn new(resource: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            resource: resource.into(),
            ids,
            fields: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    fn to_query(&self) -> Query {
        let mut include = vec!["id".to_string(), "name".to_string()];
        for field in &self.fields {
            if !include.contains(field) {
                include.push(field.clone());
            }
        }

        let payload = Payload::default()
            .with("profile", "minimal")
            .with("fields", json!({"include": include}))
            .with("slim", 1)
            .with("limit", self.ids.len())
            .with_filter(Condition::new("id", self.ids.clone()));

        Query::builder()
            .resource(self.resource.clone())
            .method(Method::Get)
            .payload(payload)
            .build()
    }
}

/// Load the terms of several fields in one batch.
///
/// Fields with no ids are not queried, fields without results are left out
/// of the returned map.
pub async fn retrieve_terms_from_api(
    client: &ReliefWebApiClient,
    fields: BTreeMap<String, TermQuery>,
) -> BTreeMap<String, Vec<Map<String, Value>>> {
    let queries: BTreeMap<String, Query> = fields
        .iter()
        .filter(|(_, term)| !term.ids.is_empty())
        .map(|(field, term)| (field.clone(), term.to_query()))
        .collect();

    if queries.is_empty() {
        return BTreeMap::new();
    }

    let results = client.request_multiple(queries, RequestOptions::default()).await;

    results
        .into_iter()
        .filter_map(|(field, data)| {
            let terms = data_fields(data.as_json()?);
            (!terms.is_empty()).then_some((field, terms))
        })
        .collect()
}

/// Unwrap `data[].fields` of a read API response
pub fn data_fields(response: &Value) -> Vec<Map<String, Value>> {
    response
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("fields").and_then(Value::as_object).cloned())
                .collect()
        })
        .unwrap_or_default()
}
