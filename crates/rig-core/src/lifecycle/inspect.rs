//! Field selection over container inspect documents.

use serde_json::Value;

/// Field name selecting the whole document.
pub const ALL_FIELDS: &str = "all";

/// Selects `field` from an inspect document.
///
/// `all` selects the whole document. Otherwise `field` is a dotted path whose
/// segments match object keys ignoring ASCII case and underscores, so
/// `host_config.binds` finds `HostConfig.Binds`. Numeric segments index
/// arrays.
#[must_use]
pub fn select_field<'a>(document: &'a Value, field: &str) -> Option<&'a Value> {
    if field.eq_ignore_ascii_case(ALL_FIELDS) {
        return Some(document);
    }
    if field.is_empty() {
        return None;
    }
    field.split('.').try_fold(document, |value, segment| match value {
        Value::Object(map) => {
            let wanted = normalise(segment);
            map.iter()
                .find(|(key, _)| normalise(key) == wanted)
                .map(|(_, nested)| nested)
        }
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

fn normalise(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn document() -> Value {
        json!({
            "Id": "abc",
            "HostConfig": { "Binds": ["/host:/data"], "PublishAllPorts": true },
            "Config": { "Env": ["A=1", "B=2"] },
        })
    }

    #[rstest]
    #[case("all")]
    #[case("ALL")]
    fn all_selects_everything(#[case] field: &str) {
        let doc = document();
        assert_eq!(select_field(&doc, field), Some(&doc));
    }

    #[rstest]
    #[case("host_config.binds", json!(["/host:/data"]))]
    #[case("HostConfig.PublishAllPorts", json!(true))]
    #[case("hostconfig.publish_all_ports", json!(true))]
    #[case("config.env.1", json!("B=2"))]
    #[case("id", json!("abc"))]
    fn dotted_paths_match_loosely(#[case] field: &str, #[case] expected: Value) {
        assert_eq!(select_field(&document(), field), Some(&expected));
    }

    #[rstest]
    #[case("")]
    #[case("host_config.missing")]
    #[case("id.deeper")]
    #[case("config.env.9")]
    fn unknown_paths_select_nothing(#[case] field: &str) {
        assert_eq!(select_field(&document(), field), None);
    }
}
