//! Pulling parameter values out of provider responses.

use serde_json::Value;

/// Wrapper keys whose array value is treated as the response's row list.
const LIST_WRAPPERS: &[&str] = &["data", "items", "results"];

/// How deep [`extract_value`] looks for case variants of a key.
const MAX_SEARCH_DEPTH: usize = 3;

/// Rows of a list-shaped response: a bare array, or an array under one of the
/// common wrapper keys (`data`, `items`, `results`).
pub fn response_rows(response: &Value) -> Option<&[Value]> {
    match response {
        Value::Array(rows) => Some(rows),
        Value::Object(obj) => LIST_WRAPPERS
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_array()))
            .map(Vec::as_slice),
        _ => None,
    }
}

/// Value of `name` (or a case variant of it) carried directly by an object
/// response, ignoring anything nested in wrappers or list properties.
pub fn own_field(response: &Value, name: &str) -> Option<Value> {
    let obj = response.as_object()?;
    case_variants(name)
        .iter()
        .find_map(|variant| non_null(obj.get(variant.as_str())))
        .cloned()
}

/// Rows to choose `name` from: `None` when the response is a single object
/// that carries `name` itself, otherwise [`response_rows`].
pub fn rows_for<'a>(response: &'a Value, name: &str) -> Option<&'a [Value]> {
    if own_field(response, name).is_some() {
        return None;
    }
    response_rows(response)
}

/// Extract the value of `name` from a single response object.
///
/// Tries, in order: the key itself, a `data` wrapper, case variants
/// (lower, upper, snake_case, camelCase) searched a few levels deep, and
/// finally, when `id_fallback` is set, any id-shaped field. Null values count
/// as absent.
pub fn extract_value(response: &Value, name: &str, id_fallback: bool) -> Option<Value> {
    if let Value::Array(rows) = response {
        return rows
            .first()
            .and_then(|row| extract_value(row, name, id_fallback));
    }
    let obj = response.as_object()?;

    if let Some(v) = non_null(obj.get(name)) {
        return Some(v.clone());
    }

    match obj.get("data") {
        Some(Value::Array(rows)) => {
            if let Some(v) = non_null(rows.first().and_then(|row| row.get(name))) {
                return Some(v.clone());
            }
        }
        Some(data @ Value::Object(_)) => {
            if let Some(v) = non_null(data.get(name)) {
                return Some(v.clone());
            }
        }
        _ => {}
    }

    for variant in &case_variants(name) {
        if let Some(v) = find_nested(response, variant, MAX_SEARCH_DEPTH) {
            return Some(v.clone());
        }
    }

    if id_fallback {
        return find_any_id(response).cloned();
    }
    None
}

/// Find the first id-shaped field: `id` itself, then any key ending in `id`
/// (case-insensitive), then the same inside a `data` wrapper.
pub fn find_any_id(data: &Value) -> Option<&Value> {
    let obj = data.as_object()?;

    if let Some(v) = obj
        .iter()
        .find(|(k, v)| k.eq_ignore_ascii_case("id") && !v.is_null())
        .map(|(_, v)| v)
    {
        return Some(v);
    }
    if let Some(v) = obj
        .iter()
        .find(|(k, v)| k.to_lowercase().ends_with("id") && !v.is_null())
        .map(|(_, v)| v)
    {
        return Some(v);
    }

    match obj.get("data") {
        Some(inner @ Value::Object(_)) => find_any_id(inner),
        Some(Value::Array(rows)) => rows.first().and_then(find_any_id),
        _ => None,
    }
}

/// Short one-line label for a row, used when a human picks from a list.
pub fn row_label(row: &Value, name: &str) -> String {
    let key_value = extract_value(row, name, false).or_else(|| find_any_id(row).cloned());
    let title = ["name", "title", "displayName", "label", "email"]
        .iter()
        .find_map(|k| row.get(*k).and_then(|v| v.as_str()));

    match (key_value, title) {
        (Some(v), Some(t)) => format!("{} ({t})", display(&v)),
        (Some(v), None) => display(&v),
        (None, Some(t)) => t.to_string(),
        (None, None) => {
            let mut s = row.to_string();
            if s.len() > 80 {
                let cut = (0..=77).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
                s.truncate(cut);
                s.push_str("...");
            }
            s
        }
    }
}

/// Render a value for a human: strings without quotes, everything else as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn case_variants(name: &str) -> [String; 5] {
    [
        name.to_string(),
        name.to_lowercase(),
        name.to_uppercase(),
        camel_to_snake(name),
        snake_to_camel(name),
    ]
}

fn find_nested<'a>(data: &'a Value, key: &str, depth: usize) -> Option<&'a Value> {
    if depth == 0 {
        return None;
    }
    let obj = data.as_object()?;
    if let Some(v) = non_null(obj.get(key)) {
        return Some(v);
    }
    obj.values()
        .filter(|v| v.is_object())
        .find_map(|v| find_nested(v, key, depth - 1))
}

fn camel_to_snake(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for (i, c) in text.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

fn snake_to_camel(text: &str) -> String {
    let mut parts = text.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_rows_finds_bare_and_wrapped_arrays() {
        assert_eq!(response_rows(&json!([1, 2])).unwrap().len(), 2);
        assert_eq!(response_rows(&json!({ "data": [1] })).unwrap().len(), 1);
        assert_eq!(response_rows(&json!({ "results": [1, 2, 3] })).unwrap().len(), 3);
        assert!(response_rows(&json!({ "data": { "id": 1 } })).is_none());
        assert!(response_rows(&json!("text")).is_none());
    }

    #[test]
    fn object_with_own_field_is_not_a_list() {
        let order = json!({ "orderId": "o1", "items": [{ "productId": "p1" }] });
        assert_eq!(response_rows(&order).map(<[Value]>::len), Some(1));
        assert!(rows_for(&order, "orderId").is_none());
        assert_eq!(own_field(&order, "orderId"), Some(json!("o1")));
        assert_eq!(extract_value(&order, "orderId", true), Some(json!("o1")));

        // Names the object lacks still pick from the nested rows.
        assert_eq!(rows_for(&order, "productId").map(<[Value]>::len), Some(1));
        assert!(own_field(&order, "productId").is_none());
    }

    #[test]
    fn own_field_matches_case_variants_only_at_top_level() {
        let page = json!({ "order_id": "o2", "data": [{ "orderId": "o3" }], "note": null });
        assert_eq!(own_field(&page, "orderId"), Some(json!("o2")));
        assert!(own_field(&json!({ "data": [{ "orderId": "o3" }] }), "orderId").is_none());
        assert!(own_field(&page, "note").is_none());
        assert!(own_field(&json!([{ "orderId": "o4" }]), "orderId").is_none());
    }

    #[test]
    fn extract_value_direct_and_data_wrapper() {
        assert_eq!(
            extract_value(&json!({ "itemId": "x1" }), "itemId", false),
            Some(json!("x1"))
        );
        assert_eq!(
            extract_value(&json!({ "data": [{ "itemId": "x1" }, { "itemId": "x2" }] }), "itemId", false),
            Some(json!("x1"))
        );
        assert_eq!(
            extract_value(&json!({ "data": { "itemId": "x3" } }), "itemId", false),
            Some(json!("x3"))
        );
    }

    #[test]
    fn extract_value_case_variants_and_nesting() {
        assert_eq!(
            extract_value(&json!({ "merchant_id": 7 }), "merchantId", false),
            Some(json!(7))
        );
        assert_eq!(
            extract_value(&json!({ "merchantId": 8 }), "merchant_id", false),
            Some(json!(8))
        );
        assert_eq!(
            extract_value(&json!({ "owner": { "profile": { "userid": "u1" } } }), "userId", false),
            Some(json!("u1"))
        );
        // Beyond the search depth.
        assert_eq!(
            extract_value(&json!({ "a": { "b": { "c": { "userId": "deep" } } } }), "userId", false),
            None
        );
    }

    #[test]
    fn extract_value_id_fallback_only_when_requested() {
        let response = json!({ "id": "abc", "name": "Shop" });
        assert_eq!(extract_value(&response, "merchantId", true), Some(json!("abc")));
        assert_eq!(extract_value(&response, "merchantId", false), None);
    }

    #[test]
    fn extract_value_skips_nulls() {
        assert_eq!(extract_value(&json!({ "userId": null }), "userId", false), None);
    }

    #[test]
    fn find_any_id_prefers_exact_id() {
        let row = json!({ "accountId": "a", "id": "b" });
        assert_eq!(find_any_id(&row), Some(&json!("b")));
        let nested = json!({ "data": [{ "orderId": 5 }] });
        assert_eq!(find_any_id(&nested), Some(&json!(5)));
    }

    #[test]
    fn row_label_combines_value_and_title() {
        assert_eq!(row_label(&json!({ "userId": "u1", "name": "Ada" }), "userId"), "u1 (Ada)");
        assert_eq!(row_label(&json!({ "title": "Only title" }), "userId"), "Only title");
        assert_eq!(row_label(&json!({ "id": 3 }), "userId"), "3");
    }

    #[test]
    fn case_conversions() {
        assert_eq!(camel_to_snake("merchantId"), "merchant_id");
        assert_eq!(snake_to_camel("merchant_id"), "merchantId");
        assert_eq!(snake_to_camel("plain"), "plain");
    }
}
