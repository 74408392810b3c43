use serde_json::Value;
use url::{Position, Url};

/// Replacement used when rewriting API URLs to the public site
pub const DEFAULT_URL_REPLACEMENT: &str = "https://reliefweb.int/";

/// Point API URLs at another host.
///
/// Every string value whose key starts with `url` gets its scheme and host
/// replaced by `replacement`, keeping path, query and fragment. Nested
/// objects and arrays are only visited when `recursive` is set.
pub fn update_api_urls(data: &mut Value, replacement: &str, recursive: bool) {
    match data {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                match value {
                    Value::String(text) if key.starts_with("url") => {
                        if let Some(updated) = replace_host(text, replacement) {
                            *text = updated;
                        }
                    }
                    Value::Object(_) | Value::Array(_) if recursive => {
                        update_api_urls(value, replacement, recursive);
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) if recursive => {
            for item in items {
                update_api_urls(item, replacement, recursive);
            }
        }
        _ => {}
    }
}

fn replace_host(raw: &str, replacement: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if !url.has_host() {
        return None;
    }
    let rest = &url[Position::BeforePath..];
    Some(format!(
        "{}/{}",
        replacement.trim_end_matches('/'),
        rest.trim_start_matches('/')
    ))
}
