use std::iter::repeat;
use std::path::{Path, PathBuf};

use bson::Bson;
use serde_json::{Map, Number, Value};

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

/// Converts stored BSON into the JSON shape clients expect.
///
/// ObjectIds become hex strings and dates become RFC 3339 strings; anything
/// without a natural JSON form falls back to relaxed extended JSON.
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Number(Number::from(i)),
        Bson::Int64(i) => Value::Number(Number::from(i)),
        Bson::Double(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::Number(Number::from(dt.timestamp_millis())),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(k, v)| (k, bson_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn object_ids_render_as_hex() {
        let id = ObjectId::new();
        let rendered = bson_to_json(Bson::Document(doc! {
            "_id": id,
            "price": 12.5,
            "weeks": 8_i32,
            "tags": ["a", "b"],
            "image": Bson::Null,
        }));

        assert_eq!(
            rendered,
            json!({
                "_id": id.to_hex(),
                "price": 12.5,
                "weeks": 8,
                "tags": ["a", "b"],
                "image": null,
            })
        );
    }

    #[test]
    fn first_existing_subpath_is_found() {
        let found = find_first_subpath("/", &["definitely-missing", "tmp"], Path::exists);
        assert_eq!(found, Some(PathBuf::from("/tmp")));
    }
}
