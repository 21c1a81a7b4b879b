//! Result matcher.
//!
//! The status code is always checked first. The body is then checked either
//! by a predicate over the full response or by a partial deep match: every
//! key of an expected object must be present and match in the actual value,
//! extra actual keys are ignored. Arrays match when every expected element
//! matches a distinct actual element, in any order.

use serde_json::Value;

use crate::registry::{Expectation, TestCase};
use crate::types::ResponseEnvelope;

/// Outcome of matching one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Status and body both matched.
    Pass,
    /// Status code differed; the body was not examined.
    StatusMismatch {
        /// Status the test required.
        expected: u16,
        /// Status the handler returned.
        actual: u16,
    },
    /// Status matched but the body expectation did not hold.
    BodyMismatch,
}

impl Verdict {
    /// Returns true for [`Verdict::Pass`].
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Evaluates a test case's expectations against a response.
///
/// Suspends while an asynchronous predicate resolves.
pub async fn evaluate(case: &TestCase, response: &ResponseEnvelope) -> Verdict {
    evaluate_parts(case.expected_status, case.expected_result.as_ref(), response).await
}

/// Evaluates an explicit status and expectation against a response.
pub async fn evaluate_parts(
    expected_status: u16,
    expected: Option<&Expectation>,
    response: &ResponseEnvelope,
) -> Verdict {
    if response.status_code != expected_status {
        return Verdict::StatusMismatch {
            expected: expected_status,
            actual: response.status_code,
        };
    }

    let body_ok = match expected {
        None => true,
        Some(Expectation::Literal(value)) => partial_match(value, &response.body),
        Some(Expectation::Predicate(check)) => check(response.clone()).await,
    };

    if body_ok {
        Verdict::Pass
    } else {
        Verdict::BodyMismatch
    }
}

/// Returns true if `actual` contains everything `expected` specifies.
#[must_use]
pub fn partial_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => exp
            .iter()
            .all(|(key, e)| act.get(key).is_some_and(|a| partial_match(e, a))),
        (Value::Array(exp), Value::Array(act)) => {
            if act.len() < exp.len() {
                return false;
            }
            let candidates: Vec<Vec<usize>> = exp
                .iter()
                .map(|e| {
                    act.iter()
                        .enumerate()
                        .filter(|(_, a)| partial_match(e, a))
                        .map(|(i, _)| i)
                        .collect()
                })
                .collect();
            let mut owner: Vec<Option<usize>> = vec![None; act.len()];
            (0..exp.len()).all(|e| {
                let mut visited = vec![false; act.len()];
                assign(e, &candidates, &mut owner, &mut visited)
            })
        }
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => e == a,
        },
        _ => expected == actual,
    }
}

/// Gives expected element `e` an actual element of its own, moving earlier
/// claims along an augmenting path when its candidates are all taken.
fn assign(
    e: usize,
    candidates: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &a in &candidates[e] {
        if visited[a] {
            continue;
        }
        visited[a] = true;
        let free = match owner[a] {
            None => true,
            Some(other) => assign(other, candidates, owner, visited),
        };
        if free {
            owner[a] = Some(e);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn response(status: u16, body: Value) -> ResponseEnvelope {
        ResponseEnvelope::new(status, body, "")
    }

    #[test]
    fn test_partial_object_match() {
        assert!(partial_match(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!partial_match(&json!({"a": 1}), &json!({"a": 2})));
        assert!(!partial_match(&json!({"a": 1}), &json!({"b": 1})));
    }

    #[test]
    fn test_partial_match_recursive() {
        assert!(partial_match(
            &json!({"a": {"x": 1}}),
            &json!({"a": {"x": 1, "y": 2}})
        ));
        assert!(!partial_match(&json!({"a": {"x": 1}}), &json!({"a": {"y": 2}})));
    }

    #[test]
    fn test_array_elements_partially_matched() {
        let actual = json!([{"city": "Marseille, FRA", "zone": "Europe/Paris"}]);
        assert!(partial_match(&json!([{"zone": "Europe/Paris"}]), &actual));
        assert!(!partial_match(&json!([{"zone": "Europe/Berlin"}]), &actual));
    }

    #[test]
    fn test_array_matching_uses_distinct_elements() {
        assert!(partial_match(&json!([2, 1]), &json!([1, 2, 3])));
        assert!(!partial_match(&json!([1, 1]), &json!([1, 2])));
        assert!(!partial_match(&json!([1, 2, 3]), &json!([1, 2])));
        assert!(partial_match(&json!([]), &json!([1])));
    }

    #[test]
    fn test_array_matching_ignores_expected_order() {
        let actual = json!([{"a": 1, "b": 2}, {"a": 1}]);
        // {"a": 1} also fits the first element, which {"a": 1, "b": 2} needs.
        assert!(partial_match(&json!([{"a": 1}, {"a": 1, "b": 2}]), &actual));
        assert!(partial_match(&json!([{"a": 1, "b": 2}, {"a": 1}]), &actual));
        assert!(!partial_match(&json!([{"b": 2}, {"a": 1, "b": 2}]), &actual));
    }

    #[test]
    fn test_array_matching_reassigns_nested_claims() {
        let actual = json!([
            {"zone": "Europe/Paris", "city": "Marseille"},
            {"zone": "Europe/Paris"},
            {"city": "Fairbanks"}
        ]);
        let expected = json!([{"zone": "Europe/Paris"}, {"city": "Marseille"}, {}]);
        assert!(partial_match(&expected, &actual));
    }

    #[test]
    fn test_scalars() {
        assert!(partial_match(&json!("oof"), &json!("oof")));
        assert!(!partial_match(&json!("oof"), &json!("foo")));
        assert!(partial_match(&json!(1), &json!(1.0)));
        assert!(!partial_match(&json!(null), &json!(0)));
        assert!(!partial_match(&json!("1"), &json!(1)));
        assert!(!partial_match(&json!({"a": 1}), &json!("a")));
    }

    #[tokio::test]
    async fn test_status_checked_before_body() {
        let exp = Expectation::predicate(|_| true);
        let verdict = evaluate_parts(200, Some(&exp), &response(500, json!("oof"))).await;
        assert_eq!(
            verdict,
            Verdict::StatusMismatch {
                expected: 200,
                actual: 500
            }
        );
    }

    #[tokio::test]
    async fn test_literal_expectation() {
        let exp = Expectation::literal("oof");
        assert!(evaluate_parts(200, Some(&exp), &response(200, json!("oof"))).await.passed());
        assert_eq!(
            evaluate_parts(200, Some(&exp), &response(200, json!("foo"))).await,
            Verdict::BodyMismatch
        );
    }

    #[tokio::test]
    async fn test_missing_expectation_accepts_any_body() {
        assert!(evaluate_parts(200, None, &response(200, json!({"x": 1}))).await.passed());
    }

    #[tokio::test]
    async fn test_sync_predicate_sees_full_response() {
        let exp = Expectation::predicate(|r| r.body == json!("rab") && r.status_code == 200);
        assert!(evaluate_parts(200, Some(&exp), &response(200, json!("rab"))).await.passed());
        assert!(!evaluate_parts(200, Some(&exp), &response(200, json!("bar"))).await.passed());
    }

    #[tokio::test]
    async fn test_async_predicate_is_awaited() {
        let exp = Expectation::async_predicate(|r: ResponseEnvelope| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            r.body == json!("bar#baz")
        });
        assert!(evaluate_parts(200, Some(&exp), &response(200, json!("bar#baz"))).await.passed());
        assert!(!evaluate_parts(200, Some(&exp), &response(200, json!("baz"))).await.passed());
    }

    #[tokio::test]
    async fn test_evaluate_uses_case_fields() {
        let case = TestCase::new("t")
            .expect_status(201)
            .expect(Expectation::literal(json!({"ok": true})));
        assert!(evaluate(&case, &response(201, json!({"ok": true, "extra": 1}))).await.passed());
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_match_is_reflexive(value in arb_json()) {
            prop_assert!(partial_match(&value, &value));
        }

        #[test]
        fn prop_extra_keys_are_ignored(
            base in proptest::collection::btree_map("[a-z]{1,4}", arb_json(), 0..4),
            extra in arb_json(),
        ) {
            let expected = Value::Object(base.clone().into_iter().collect());
            let mut actual: serde_json::Map<String, Value> = base.into_iter().collect();
            actual.insert("zz_extra".to_string(), extra);
            prop_assert!(partial_match(&expected, &Value::Object(actual)));
        }

        #[test]
        fn prop_array_order_is_irrelevant(items in proptest::collection::vec(arb_json(), 0..5)) {
            let reversed: Vec<Value> = items.iter().rev().cloned().collect();
            prop_assert!(partial_match(&Value::Array(reversed), &Value::Array(items)));
        }
    }
}
