//! Soft checks over responses and decoded bodies.
//!
//! A [`Verdict`] records whether a check passed and, if not, why. Checks can
//! be chained with [`Verdict::and`] so one test collects several before it
//! asserts; hard failures (transport, login) stay on the `Err` side of
//! [`crate::error::Result`].

use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn fail(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "Verification failed");
        Verdict::Fail(reason)
    }

    pub fn check(ok: bool, reason: impl FnOnce() -> String) -> Self {
        if ok { Verdict::Pass } else { Verdict::fail(reason()) }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Keeps the first failure.
    pub fn and(self, other: Verdict) -> Verdict {
        match self {
            Verdict::Pass => other,
            fail => fail,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(reason) => Some(reason),
        }
    }
}

impl From<Verdict> for bool {
    fn from(v: Verdict) -> bool {
        v.is_pass()
    }
}

pub fn expect_status(actual: StatusCode, expected: u16) -> Verdict {
    Verdict::check(actual.as_u16() == expected, || {
        format!("expected status {}, got {}", expected, actual.as_u16())
    })
}

/// True when every key/value of `expected` is present in `actual`.
/// Objects are compared recursively; arrays must match element for element.
pub fn json_contains(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => exp
            .iter()
            .all(|(k, v)| act.get(k).is_some_and(|a| json_contains(v, a))),
        (Value::Array(exp), Value::Array(act)) => {
            exp.len() == act.len() && exp.iter().zip(act).all(|(e, a)| json_contains(e, a))
        }
        (e, a) => e == a,
    }
}

pub fn verify_json_contains(expected: &Value, actual: &Value) -> Verdict {
    Verdict::check(json_contains(expected, actual), || {
        format!("expected {} to be contained in {}", expected, actual)
    })
}

/// Number of objects in `items` whose `key` equals `value`.
pub fn count_matching(items: &[Value], key: &str, value: &str) -> usize {
    items
        .iter()
        .filter(|item| item.get(key).and_then(Value::as_str) == Some(value))
        .count()
}

pub fn list_contains(items: &[Value], key: &str, value: &str) -> bool {
    count_matching(items, key, value) > 0
}

/// Whether `items` are ordered by the string (or numeric) field `key`.
pub fn sorted_by(items: &[Value], key: &str, descending: bool) -> bool {
    items.windows(2).all(|pair| {
        let ordering = compare_field(&pair[0], &pair[1], key);
        if descending {
            ordering != std::cmp::Ordering::Less
        } else {
            ordering != std::cmp::Ordering::Greater
        }
    })
}

fn compare_field(a: &Value, b: &Value, key: &str) -> std::cmp::Ordering {
    match (a.get(key), b.get(key)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(x), Some(y)) => x
            .as_str()
            .unwrap_or_default()
            .to_lowercase()
            .cmp(&y.as_str().unwrap_or_default().to_lowercase()),
        _ => std::cmp::Ordering::Equal,
    }
}
