//! Report mappings between submitted content and read API data

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::kind::{MappingContext, RecordRef};
use crate::storage::{FileMeta, file_uuid_from_url};
use crate::terms::{TermQuery, retrieve_terms_from_api};

/// API term field, content field, API resource, extra fields
const TERM_FIELDS: &[(&str, &str, &str, &[&str])] = &[
    ("primary_country", "country", "countries", &["name", "iso3", "shortname"]),
    ("country", "country", "countries", &["name", "iso3", "shortname"]),
    ("source", "source", "sources", &["name", "shortname"]),
    ("format", "format", "references/content-formats", &["name"]),
    ("language", "language", "references/languages", &["name", "code"]),
    ("disaster", "disaster", "disasters", &["name"]),
    ("disaster_type", "disaster_type", "references/disaster-types", &["name"]),
    ("theme", "theme", "references/themes", &["name"]),
];

fn term_ids(content: &Map<String, Value>, field: &str) -> Vec<i64> {
    content
        .get(field)
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_i64().or_else(|| id.as_str()?.parse().ok()))
                .collect()
        })
        .unwrap_or_default()
}

fn field_or_null(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or(Value::Null)
}

/// UUID of a file item, from its `uuid` or its `url`
fn item_uuid(item: &Value) -> Option<Uuid> {
    item.get("uuid")
        .and_then(Value::as_str)
        .and_then(|uuid| Uuid::parse_str(uuid).ok())
        .or_else(|| file_uuid_from_url(item.get("url")?.as_str()?))
}

async fn load_file(context: &MappingContext<'_>, item: &Value) -> Option<FileMeta> {
    let uuid = item_uuid(item)?;
    match context.attachments.metadata(&uuid).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(uuid = %uuid, error = %e, "Unable to load attachment");
            None
        }
    }
}

pub(super) async fn submitted_content_to_api_data(
    context: &MappingContext<'_>,
    record: RecordRef<'_>,
    content: &Map<String, Value>,
) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("url".to_string(), json!(record.resource_url));
    data.insert("uuid".to_string(), field_or_null(content, "uuid"));
    data.insert("title".to_string(), field_or_null(content, "title"));
    data.insert("body-html".to_string(), field_or_null(content, "body"));
    data.insert(
        "date".to_string(),
        json!({
            "original": field_or_null(content, "published"),
            "created": record.created_at.to_rfc3339(),
            "changed": record.changed_at.to_rfc3339(),
        }),
    );

    let countries = term_ids(content, "country");
    let mut fields = BTreeMap::new();
    for (api_field, content_field, resource, extra) in TERM_FIELDS {
        let ids = match *api_field {
            "primary_country" => countries.iter().take(1).copied().collect(),
            "country" => countries.iter().skip(1).copied().collect(),
            _ => term_ids(content, content_field),
        };
        fields.insert(
            api_field.to_string(),
            TermQuery::new(*resource, ids).with_fields(extra.iter().copied()),
        );
    }

    for (field, terms) in retrieve_terms_from_api(context.client, fields).await {
        data.insert(field, Value::Array(terms.into_iter().map(Value::Object).collect()));
    }

    let mut files = Vec::new();
    for item in content.get("file").and_then(Value::as_array).into_iter().flatten() {
        if let Some(meta) = load_file(context, item).await {
            files.push(json!({
                "url": meta.preview_url(context.public_url),
                "filename": meta.filename,
                "filesize": meta.filesize,
                "mimetype": meta.mimetype,
            }));
        }
    }
    if !files.is_empty() {
        data.insert("file".to_string(), Value::Array(files));
    }

    if let Some(image) = content.get("image") {
        if let Some(meta) = load_file(context, image).await {
            let url = meta.preview_url(context.public_url);
            data.insert(
                "image".to_string(),
                json!({
                    "url": url,
                    "url-small": url,
                    "url-medium": url,
                    "url-large": url,
                    "filename": meta.filename,
                    "filesize": meta.filesize,
                    "mimetype": meta.mimetype,
                    "copyright": image.get("copyright").and_then(Value::as_str).unwrap_or_default(),
                    "caption": image.get("description").and_then(Value::as_str).unwrap_or_default(),
                }),
            );
        }
    }

    data
}

/// Drop null members, like an empty optional field in a form
fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

pub(super) fn api_data_to_submitted_content(
    record: RecordRef<'_>,
    data: &Map<String, Value>,
) -> Map<String, Value> {
    let mut content = Map::new();
    content.insert("url".to_string(), json!(record.resource_url));
    content.insert("uuid".to_string(), json!(record.resource_uuid.to_string()));
    content.insert("title".to_string(), field_or_null(data, "title"));
    content.insert("body".to_string(), field_or_null(data, "body-html"));
    content.insert(
        "published".to_string(),
        data.get("date")
            .and_then(|date| date.get("original"))
            .cloned()
            .unwrap_or(Value::Null),
    );

    for (api_field, content_field, _, _) in TERM_FIELDS {
        let ids = data
            .get(*api_field)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| item.get("id").cloned());
        for id in ids {
            if let Value::Array(list) = content
                .entry(content_field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                if !list.contains(&id) {
                    list.push(id);
                }
            }
        }
    }

    let files: Vec<Value> = data
        .get("file")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|file| {
            let url = file.get("url").and_then(Value::as_str).unwrap_or_default();
            without_nulls(json!({
                "url": file.get("url"),
                "uuid": file_uuid_from_url(url).map(|uuid| uuid.to_string()),
                "filename": file.get("filename"),
                "description": file.get("description"),
                "language": file.get("language"),
            }))
        })
        .collect();
    if !files.is_empty() {
        content.insert("file".to_string(), Value::Array(files));
    }

    if let Some(image) = data.get("image") {
        let url = image.get("url").and_then(Value::as_str).unwrap_or_default();
        content.insert(
            "image".to_string(),
            without_nulls(json!({
                "url": image.get("url"),
                "uuid": file_uuid_from_url(url).map(|uuid| uuid.to_string()),
                "copyright": image.get("copyright"),
                "description": image.get("caption"),
            })),
        );
    }

    content
}

pub(super) fn attached_files(content: &Map<String, Value>) -> Vec<Uuid> {
    let mut uuids = Vec::new();
    let files = content.get("file").and_then(Value::as_array).into_iter().flatten();
    for item in files.chain(content.get("image")) {
        if let Some(uuid) = item_uuid(item) {
            if !uuids.contains(&uuid) {
                uuids.push(uuid);
            }
        }
    }
    uuids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record_ref(url: &str) -> RecordRef<'_> {
        RecordRef {
            resource_url: url,
            resource_uuid: Uuid::nil(),
            created_at: Utc::now(),
            changed_at: Utc::now(),
        }
    }

    #[test]
    fn test_term_ids_accept_numeric_strings() {
        let content = json!({"source": [1503, "620", "x"]});
        assert_eq!(term_ids(content.as_object().unwrap(), "source"), vec![1503, 620]);
        assert!(term_ids(content.as_object().unwrap(), "theme").is_empty());
    }

    #[test]
    fn test_api_data_to_submitted_content() {
        let file_uuid = "6c2a8f3e-1d5b-4f7a-9c1e-2b3d4e5f6a7b";
        let data = json!({
            "title": "Chad: Flash update",
            "body-html": "<p>Floods</p>",
            "date": {"original": "2024-02-01T00:00:00+00:00"},
            "primary_country": [{"id": 43, "name": "Chad"}],
            "country": [{"id": 43}, {"id": 164}],
            "source": [{"id": 1503}],
            "theme": [{"id": 4590}, {"name": "no id"}],
            "file": [{
                "url": format!("https://reliefweb.int/attachments/{}.pdf", file_uuid),
                "filename": "update.pdf"
            }],
            "image": {
                "url": format!("https://reliefweb.int/images/{}.jpg", file_uuid),
                "caption": "Flooded road"
            }
        });

        let content = api_data_to_submitted_content(
            record_ref("https://www.unocha.org/submissions/1"),
            data.as_object().unwrap(),
        );

        assert_eq!(content["url"], "https://www.unocha.org/submissions/1");
        assert_eq!(content["title"], "Chad: Flash update");
        assert_eq!(content["body"], "<p>Floods</p>");
        assert_eq!(content["published"], "2024-02-01T00:00:00+00:00");
        assert_eq!(content["country"], json!([43, 164]));
        assert_eq!(content["source"], json!([1503]));
        assert_eq!(content["theme"], json!([4590]));
        assert_eq!(content["file"][0]["uuid"], file_uuid);
        assert!(content["file"][0].get("description").is_none());
        assert_eq!(content["image"]["description"], "Flooded road");
        assert!(content.get("format").is_none());
    }

    #[test]
    fn test_attached_files() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let content = json!({
            "file": [
                {"uuid": a.to_string()},
                {"url": format!("https://www.unocha.org/reliefweb/files/{}.pdf", b)},
                {"uuid": a.to_string()},
                {"filename": "orphan.pdf"}
            ],
            "image": {"uuid": b.to_string()}
        });
        assert_eq!(attached_files(content.as_object().unwrap()), vec![a, b]);
    }
}
