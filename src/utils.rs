//! Header and option merge helpers shared by the client and the pipeline.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use serde_json::{Map, Value};

use crate::error::Result;

/// Merge header maps left to right; later maps win per header name.
///
/// Header names are case-insensitive, so `Content-Type` in one map and
/// `content-type` in a later one collapse into a single entry. All values
/// of a name are replaced, not appended.
pub fn merge_headers<'a, I>(maps: I) -> HeaderMap
where
    I: IntoIterator<Item = &'a HeaderMap>,
{
    let mut merged = HeaderMap::new();

    for map in maps {
        for name in map.keys() {
            merged.remove(name);
            for value in map.get_all(name) {
                merged.append(name.clone(), value.clone());
            }
        }
    }

    merged
}

/// Build a header map from string pairs, lower-casing names.
///
/// Later pairs replace earlier ones with the same (case-insensitive) name.
pub fn headers_from_pairs<I, K, V>(pairs: I) -> Result<HeaderMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();

    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())?;
        let value = HeaderValue::from_str(value.as_ref())?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Shallow-merge JSON objects left to right, copying only their own keys.
pub fn merge_objects<'a, I>(objects: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();

    for object in objects {
        for (key, value) in object {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

/// Append `tag` unless it is already present.
pub fn push_tag(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}
