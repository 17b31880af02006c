//! Attribute validators
//!
//! A validator is a named predicate over an attribute value that returns a
//! failure message, or `None` when the value is acceptable. Validators run
//! in definition order and every failure is reported.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::value::Value;

type CheckFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// A named validation predicate
#[derive(Clone)]
pub struct Validator {
    description: String,
    check: Arc<CheckFn>,
}

impl Validator {
    /// Create a validator from a description and a check function
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }

    /// Run the check, returning a failure message if the value is rejected
    pub fn check(&self, value: &Value) -> Option<String> {
        (self.check)(value)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.description).finish()
    }
}

/// Characters Artifactory refuses in repository keys
const RESERVED_KEY_CHARS: &[char] = &[
    ' ', '/', '\\', ':', '|', '?', '*', '"', '<', '>', ',', '#', '%', '&', ';',
];

static PROJECT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9\-]{1,31}$").expect("valid project key regex"));

/// Repository key: 1-64 characters, not starting with a digit, no reserved characters
pub fn repo_key() -> Validator {
    Validator::new("repository key", |value| {
        let key = value.as_str()?;
        if key.is_empty() {
            return Some("repository key cannot be empty".to_string());
        }
        if key.chars().count() > 64 {
            return Some("repository key must be at most 64 characters".to_string());
        }
        if key.starts_with(|c: char| c.is_ascii_digit()) {
            return Some("repository key cannot begin with a number".to_string());
        }
        if let Some(c) = key.chars().find(|c| RESERVED_KEY_CHARS.contains(c)) {
            return Some(format!("repository key cannot contain '{}'", c));
        }
        None
    })
}

/// Project key: 2-32 lowercase alphanumerics or hyphens, starting with a letter
pub fn project_key() -> Validator {
    Validator::new("project key", |value| {
        let key = value.as_str()?;
        if PROJECT_KEY_RE.is_match(key) {
            None
        } else {
            Some(format!(
                "project key '{}' must be 2-32 lowercase alphanumeric characters starting with a letter",
                key
            ))
        }
    })
}

/// String must be one of the given values
pub fn one_of(allowed: &[&str]) -> Validator {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    Validator::new(format!("one of [{}]", allowed.join(", ")), move |value| {
        let s = value.as_str()?;
        if allowed.iter().any(|a| a == s) {
            None
        } else {
            Some(format!("'{}' is not one of [{}]", s, allowed.join(", ")))
        }
    })
}

/// Every set element must be one of the given values
pub fn set_subset_of(allowed: &[&str]) -> Validator {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    Validator::new(
        format!("subset of [{}]", allowed.join(", ")),
        move |value| {
            let set = value.as_set()?;
            let rejected: Vec<&str> = set
                .iter()
                .filter(|item| !allowed.contains(item))
                .map(String::as_str)
                .collect();
            if rejected.is_empty() {
                None
            } else {
                Some(format!(
                    "unsupported values [{}], allowed: [{}]",
                    rejected.join(", "),
                    allowed.join(", ")
                ))
            }
        },
    )
}

/// Integer must be greater than or equal to `min`
pub fn at_least(min: i64) -> Validator {
    Validator::new(format!(">= {}", min), move |value| {
        let i = value.as_int()?;
        (i < min).then(|| format!("{} is less than {}", i, min))
    })
}

/// Integer must be within `min..=max`
pub fn between(min: i64, max: i64) -> Validator {
    Validator::new(format!("between {} and {}", min, max), move |value| {
        let i = value.as_int()?;
        (!(min..=max).contains(&i)).then(|| format!("{} is not between {} and {}", i, min, max))
    })
}

/// String must match the regular expression
pub fn matches(pattern: &str, message: impl Into<String>) -> Validator {
    let message = message.into();
    let re = Regex::new(pattern);
    Validator::new(format!("matches {}", pattern), move |value| {
        let s = value.as_str()?;
        match &re {
            Ok(re) if re.is_match(s) => None,
            Ok(_) => Some(message.clone()),
            Err(e) => Some(format!("invalid validation pattern: {}", e)),
        }
    })
}

/// String must be an absolute http(s) URL
pub fn url() -> Validator {
    Validator::new("http(s) URL", |value| {
        let s = value.as_str()?;
        match url::Url::parse(s) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => None,
            Ok(u) => Some(format!("unsupported URL scheme '{}'", u.scheme())),
            Err(e) => Some(format!("'{}' is not a valid URL: {}", s, e)),
        }
    })
}

/// String, set or list must not be empty
pub fn not_empty() -> Validator {
    Validator::new("not empty", |value| {
        let empty = match value {
            Value::String(s) => s.trim().is_empty(),
            Value::StringSet(s) => s.is_empty(),
            Value::StringList(l) => l.is_empty(),
            Value::Blocks(b) => b.is_empty(),
            _ => false,
        };
        empty.then(|| "value cannot be empty".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_key() {
        let v = repo_key();

        assert!(v.check(&Value::from("libs-release-local")).is_none());
        assert!(v.check(&Value::from("")).is_some());
        assert!(v.check(&Value::from("1-repo")).is_some());
        assert!(v.check(&Value::from("my repo")).is_some());
        assert!(v.check(&Value::from("a/b")).is_some());
        assert!(v.check(&Value::from("x".repeat(65))).is_some());
        for key in ["libs#x", "libs%2F", "a&b", "a;b"] {
            assert!(v.check(&Value::from(key)).is_some(), "{} accepted", key);
        }
        assert!(v.check(&Value::from("c++libs")).is_none());
    }

    #[test]
    fn test_project_key() {
        let v = project_key();

        assert!(v.check(&Value::from("myproj")).is_none());
        assert!(v.check(&Value::from("MyProj")).is_some());
        assert!(v.check(&Value::from("a")).is_some());
    }

    #[test]
    fn test_one_of() {
        let v = one_of(&["unique", "non-unique", "deployer"]);

        assert!(v.check(&Value::from("unique")).is_none());
        let failure = v.check(&Value::from("sometimes")).unwrap();
        assert!(failure.contains("sometimes"));
    }

    #[test]
    fn test_set_subset_of() {
        let v = set_subset_of(&["bz2", "lzma", "xz"]);

        assert!(v.check(&Value::string_set(["bz2", "xz"])).is_none());
        assert!(v.check(&Value::string_set(["gz"])).is_some());
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(at_least(1).check(&Value::Int(0)).is_some());
        assert!(at_least(1).check(&Value::Int(1)).is_none());
        assert!(between(0, 10).check(&Value::Int(11)).is_some());
        assert!(between(0, 10).check(&Value::Int(10)).is_none());
    }

    #[test]
    fn test_url() {
        let v = url();

        assert!(v.check(&Value::from("https://repo1.maven.org/maven2")).is_none());
        assert!(v.check(&Value::from("ftp://example.com")).is_some());
        assert!(v.check(&Value::from("not a url")).is_some());
    }

    #[test]
    fn test_validators_ignore_other_kinds() {
        // Kind mismatches are reported by schema validation, not by validators
        assert!(repo_key().check(&Value::Bool(true)).is_none());
        assert!(at_least(1).check(&Value::from("x")).is_none());
    }
}
