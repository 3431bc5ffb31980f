//! Sparse compression of exported JSON.
//!
//! The summary tree is built with every field present so templates can rely
//! on its shape. Before it is handed out as JSON, [`compress`] strips
//! everything that carries no information: nulls, empty strings, empty
//! arrays, empty objects and zero/zero checklist counters.

use serde_json::{Map, Value};

/// Compress `value` bottom-up, returning `None` if nothing meaningful remains.
#[must_use]
pub fn compress(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(compress).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Array(kept))
            }
        }
        Value::Object(fields) => {
            let kept: Map<String, Value> = fields
                .into_iter()
                .filter_map(|(k, v)| {
                    compress(v).filter(|v| !is_empty_checklist(v)).map(|v| (k, v))
                })
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        other => Some(other),
    }
}

/// Compress a tree that must stay an object at the top, such as a response.
#[must_use]
pub fn compress_object(value: Value) -> Value {
    compress(value).unwrap_or_else(|| Value::Object(Map::new()))
}

/// `{"total": 0, "open": 0}` and nothing else.
fn is_empty_checklist(value: &Value) -> bool {
    value.as_object().is_some_and(|m| {
        m.len() == 2
            && m.get("total").and_then(Value::as_u64) == Some(0)
            && m.get("open").and_then(Value::as_u64) == Some(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn has_empties(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty() || items.iter().any(has_empties),
            Value::Object(fields) => {
                fields.is_empty()
                    || fields.values().any(|v| is_empty_checklist(v) || has_empties(v))
            }
            _ => false,
        }
    }

    #[test]
    fn test_strips_empty_fields() {
        let input = json!({
            "title": "Ship",
            "notes": "",
            "tags": [],
            "deadline": null,
            "checklist": {"total": 0, "open": 0},
            "area": {"id": "", "name": ""},
            "visible": false,
            "taskCount": 0,
        });
        assert_eq!(
            compress(input),
            Some(json!({"title": "Ship", "visible": false, "taskCount": 0}))
        );
    }

    #[test]
    fn test_keeps_partial_checklist() {
        let input = json!({"checklist": {"total": 2, "open": 0}});
        assert_eq!(compress(input.clone()), Some(input));
    }

    #[test]
    fn test_nested_emptiness_collapses() {
        let input = json!({"areas": [{"projects": [{"tasks": []}], "tasks": [null, ""]}]});
        assert_eq!(compress(input), None);
        assert_eq!(compress_object(json!({"inboxTasks": []})), json!({}));
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(compress(json!(0)), Some(json!(0)));
        assert_eq!(compress(json!(false)), Some(json!(false)));
        assert_eq!(compress(json!("x")), Some(json!("x")));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (0u64..3).prop_map(Value::from),
            "[a-z]{0,3}".prop_map(Value::from),
        ];
        leaf.prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::btree_map(
                    prop_oneof![Just("total".to_string()), Just("open".to_string()), "[a-z]{1,4}"],
                    inner,
                    0..5,
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn compress_is_idempotent(value in arb_json()) {
            let once = compress(value);
            let twice = once.clone().and_then(compress);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn compress_leaves_no_empties(value in arb_json()) {
            if let Some(out) = compress(value) {
                prop_assert!(!has_empties(&out), "{}", out);
            }
        }
    }
}
