//! Fuzzy "did you mean" suggestions for unknown names
//!
//! Uses Levenshtein distance to find registered names close to a mistyped
//! one, e.g. `local:alpin` -> `local:alpine`.

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Suggestion result with confidence scoring
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggested correction
    pub text: String,
    /// Levenshtein distance (lower = better match)
    pub distance: usize,
}

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Find closest matches from a list of candidates
pub fn find_closest_matches(input: &str, candidates: &[&str], max_results: usize) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = levenshtein(input, candidate);
            if distance <= MAX_SUGGESTION_DISTANCE && distance > 0 {
                Some(Suggestion {
                    text: candidate.to_string(),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();

    // Sort by distance, then name, so ties are stable
    suggestions.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.text.cmp(&b.text)));
    suggestions.truncate(max_results);
    suggestions
}

/// Suggest a registered variant key for an unknown one
pub fn suggest_variant(input: &str, known: &[&str]) -> Option<String> {
    let matches = find_closest_matches(input, known, 3);
    if !matches.is_empty() {
        let names: Vec<String> = matches.iter().map(|m| format!("`{}`", m.text)).collect();
        return Some(format!("Did you mean {}?", names.join(" or ")));
    }

    // Right package type under the wrong class, or the reverse
    let (rclass, package_type) = input.split_once(':')?;
    let same_type: Vec<&str> = known
        .iter()
        .copied()
        .filter(|k| k.split_once(':').map(|(_, p)| p) == Some(package_type))
        .collect();
    if !same_type.is_empty() {
        return Some(format!(
            "{} repositories are available as: {}",
            package_type,
            same_type.join(", ")
        ));
    }

    let same_class = known
        .iter()
        .filter(|k| k.split_once(':').map(|(r, _)| r) == Some(rclass))
        .count();
    (same_class > 0).then(|| {
        format!(
            "Unknown package type `{}` for {} repositories",
            package_type, rclass
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["local:alpine", "local:debian", "remote:alpine", "remote:npm"];

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("alpin", "alpine"), 1);
        assert_eq!(levenshtein("local:npm", "local:npm"), 0);
    }

    #[test]
    fn test_find_closest_matches() {
        let matches = find_closest_matches("local:alpin", KNOWN, 3);

        assert_eq!(matches[0].text, "local:alpine");
        assert_eq!(matches[0].distance, 1);
    }

    #[test]
    fn test_exact_match_is_not_suggested() {
        assert!(find_closest_matches("local:alpine", &["local:alpine"], 3).is_empty());
    }

    #[test]
    fn test_suggest_variant() {
        assert_eq!(
            suggest_variant("local:alpin", KNOWN).as_deref(),
            Some("Did you mean `local:alpine`?")
        );
        assert_eq!(
            suggest_variant("virtual:alpine", KNOWN).as_deref(),
            Some("alpine repositories are available as: local:alpine, remote:alpine")
        );
        assert_eq!(
            suggest_variant("local:fortran", KNOWN).as_deref(),
            Some("Unknown package type `fortran` for local repositories")
        );
        assert_eq!(suggest_variant("nonsense", KNOWN), None);
    }
}
