//! JSON Patch construction from two canonical serializations
//!
//! Diffing works on the serialized form, so no per-kind diff logic exists.
//! Correctness relies on both inputs coming from the same canonical encoder
//! (see [`crate::Object::to_canonical_json`]).

use json_patch::Patch;
use serde_json::Value;

use crate::error::{ReviewError, MUTATED_SIDE, ORIGINAL_SIDE};

/// Compute the ordered operations turning `before` into `after`
///
/// Returns an empty patch when both documents are equal. Neither input is
/// modified.
pub fn build_patch(before: &[u8], after: &[u8]) -> Result<Patch, ReviewError> {
    let before: Value = serde_json::from_slice(before)
        .map_err(|e| ReviewError::serialization(ORIGINAL_SIDE, e.to_string()))?;
    let after: Value = serde_json::from_slice(after)
        .map_err(|e| ReviewError::serialization(MUTATED_SIDE, e.to_string()))?;

    Ok(json_patch::diff(&before, &after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ops(before: Value, after: Value) -> Value {
        let patch = build_patch(
            &serde_json::to_vec(&before).unwrap(),
            &serde_json::to_vec(&after).unwrap(),
        )
        .unwrap();
        serde_json::to_value(&patch).unwrap()
    }

    fn round_trips(before: Value, after: Value) {
        let patch = build_patch(
            &serde_json::to_vec(&before).unwrap(),
            &serde_json::to_vec(&after).unwrap(),
        )
        .unwrap();
        let mut doc = before.clone();
        json_patch::patch(&mut doc, &patch.0).unwrap();
        assert_eq!(doc, after, "patch {patch:?} did not reproduce target");
    }

    #[test]
    fn replace_scalar() {
        assert_eq!(
            ops(
                json!({"metadata":{"name":"a"},"spec":{"replicas":1}}),
                json!({"metadata":{"name":"a"},"spec":{"replicas":3}}),
            ),
            json!([{"op":"replace","path":"/spec/replicas","value":3}])
        );
    }

    #[test]
    fn identical_documents_give_empty_patch() {
        let doc = json!({"metadata":{"name":"a","labels":{"x":"y"}},"spec":{"replicas":1}});
        assert_eq!(ops(doc.clone(), doc), json!([]));
    }

    #[test]
    fn keys_with_slashes_are_escaped() {
        let patch = ops(
            json!({"metadata":{"labels":{}}}),
            json!({"metadata":{"labels":{"app.kubernetes.io/name":"web"}}}),
        );
        assert_eq!(
            patch,
            json!([{"op":"add","path":"/metadata/labels/app.kubernetes.io~1name","value":"web"}])
        );
    }

    #[test]
    fn removed_field_becomes_remove_op() {
        let patch = ops(json!({"a":1,"b":2}), json!({"a":1}));
        assert_eq!(patch, json!([{"op":"remove","path":"/b"}]));
    }

    #[test]
    fn invalid_before_is_a_serialization_error() {
        let err = build_patch(b"{", b"{}").unwrap_err();
        match err {
            ReviewError::Serialization { side, .. } => assert_eq!(side, ORIGINAL_SIDE),
            other => panic!("Expected Serialization, got {other:?}"),
        }
    }

    #[test]
    fn invalid_after_is_a_serialization_error() {
        let err = build_patch(b"{}", b"nope").unwrap_err();
        match err {
            ReviewError::Serialization { side, .. } => assert_eq!(side, MUTATED_SIDE),
            other => panic!("Expected Serialization, got {other:?}"),
        }
    }

    #[test]
    fn build_patch_is_deterministic() {
        let before = br#"{"spec":{"a":1,"b":[1,2,3],"c":{"d":true}}}"#;
        let after = br#"{"spec":{"a":2,"b":[1,3],"c":{"e":false}}}"#;
        let first = serde_json::to_vec(&build_patch(before, after).unwrap()).unwrap();
        let second = serde_json::to_vec(&build_patch(before, after).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    /// Story: Applying the produced patch always yields the mutated document
    ///
    /// The API server applies our patch to its own copy of the object, so any
    /// drift between patch and mutation would silently corrupt resources.
    #[test]
    fn story_patch_round_trips_across_shapes() {
        round_trips(json!({}), json!({"metadata":{"name":"a"}}));
        round_trips(
            json!({"metadata":{"labels":{"a":"1","b":"2"}}}),
            json!({"metadata":{"labels":{"a":"9","c":"3"}}}),
        );
        round_trips(
            json!({"spec":{"containers":[{"name":"app","image":"nginx:1"}]}}),
            json!({"spec":{"containers":[
                {"name":"app","image":"nginx:2"},
                {"name":"sidecar","image":"envoy:1"}
            ]}}),
        );
        round_trips(
            json!({"spec":{"containers":[{"name":"a"},{"name":"b"},{"name":"c"}]}}),
            json!({"spec":{"containers":[{"name":"c"}]}}),
        );
        round_trips(json!({"spec":{"x":{"y":[1,2]}}}), json!({"spec":{"x":null}}));
        round_trips(json!({"data":"text"}), json!({"data":{"nested":[true,false]}}));
        round_trips(json!([1, 2, 3]), json!([3, 2, 1, 0]));
    }

    /// Arbitrary JSON documents, keys included `/` and `~` to exercise escaping
    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9/~ ]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z/~]{1,4}", inner, 0..6)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Property: the patch between any two documents reproduces the second
        #[test]
        fn prop_patch_applied_to_before_yields_after(before in arb_json(), after in arb_json()) {
            let patch = build_patch(
                &serde_json::to_vec(&before).unwrap(),
                &serde_json::to_vec(&after).unwrap(),
            )
            .unwrap();

            let mut doc = before.clone();
            json_patch::patch(&mut doc, &patch.0).unwrap();
            prop_assert_eq!(doc, after);
        }

        /// Property: a document diffed against itself needs no operations
        #[test]
        fn prop_identical_documents_need_no_operations(doc in arb_json()) {
            let bytes = serde_json::to_vec(&doc).unwrap();
            prop_assert!(build_patch(&bytes, &bytes).unwrap().0.is_empty());
        }
    }
}
