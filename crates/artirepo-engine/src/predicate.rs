//! Field predicates for the universal pack pass
//!
//! A predicate decides whether a wire field is copied into the configuration
//! model. It sees the field under its schema attribute name when one is bound
//! (otherwise the raw wire name) together with the wire value. Returning
//! `false` excludes the field.

use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&str, &JsonValue) -> bool + Send + Sync;

/// A composable field filter
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<PredicateFn>,
}

impl Predicate {
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&str, &JsonValue) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Accepts every field
    pub fn always() -> Self {
        Self::new("always", |_, _| true)
    }

    pub fn test(&self, name: &str, value: &JsonValue) -> bool {
        (self.test)(name, value)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}

/// Accepts a field only if every predicate does (an empty list accepts all)
pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    let description = format!(
        "all({})",
        predicates
            .iter()
            .map(Predicate::description)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Predicate::new(description, move |name, value| {
        predicates.iter().all(|p| p.test(name, value))
    })
}

/// Accepts a field if any predicate does (an empty list rejects all)
pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let predicates: Vec<Predicate> = predicates.into_iter().collect();
    let description = format!(
        "any({})",
        predicates
            .iter()
            .map(Predicate::description)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Predicate::new(description, move |name, value| {
        predicates.iter().any(|p| p.test(name, value))
    })
}

pub fn not(predicate: Predicate) -> Predicate {
    let description = format!("not({})", predicate.description);
    Predicate::new(description, move |name, value| !predicate.test(name, value))
}

/// Rejects the named fields
pub fn ignore(names: &[&str]) -> Predicate {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let description = format!("ignore({})", names.join(", "));
    Predicate::new(description, move |name, _| !names.iter().any(|n| n == name))
}

/// Rejects the repository class fields, which are fixed by the variant
pub fn no_class() -> Predicate {
    ignore(&["class", "rclass"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ignore() {
        let p = ignore(&["member", "api_version"]);

        assert!(!p.test("member", &json!([])));
        assert!(!p.test("api_version", &json!("V2")));
        assert!(p.test("members", &json!([])));
    }

    #[test]
    fn test_no_class() {
        let p = no_class();

        assert!(!p.test("rclass", &json!("local")));
        assert!(!p.test("class", &json!("local")));
        assert!(p.test("key", &json!("libs")));
    }

    #[test]
    fn test_combinators() {
        let p = all([no_class(), ignore(&["member"])]);
        assert!(!p.test("rclass", &json!("local")));
        assert!(!p.test("member", &json!([])));
        assert!(p.test("key", &json!("libs")));

        let q = any([ignore(&["a"]), ignore(&["b"])]);
        assert!(q.test("a", &json!(1)));
        assert!(q.test("c", &json!(1)));

        assert!(!not(Predicate::always()).test("x", &json!(1)));
        assert!(all(Vec::new()).test("x", &json!(1)));
        assert!(!any(Vec::new()).test("x", &json!(1)));
    }

    #[test]
    fn test_value_aware_predicate() {
        let non_empty = Predicate::new("non-empty string", |_, v| {
            v.as_str().map(|s| !s.is_empty()).unwrap_or(true)
        });

        assert!(!non_empty.test("description", &json!("")));
        assert!(non_empty.test("description", &json!("docs")));
        assert!(non_empty.test("offline", &json!(false)));
    }

    #[test]
    fn test_description() {
        let p = all([no_class(), not(ignore(&["x"]))]);

        assert_eq!(p.description(), "all(ignore(class, rclass), not(ignore(x)))");
    }
}
