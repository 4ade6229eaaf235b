//! String similarity used to rank model-name suggestions.

/// Maximum number of suggestions surfaced to the user
pub const MAX_SUGGESTIONS: usize = 5;

/// Levenshtein edit distance between two strings (character based).
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Similarity in `[0.0, 1.0]`, case-insensitive; 1.0 means identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / max_len as f64
}

/// Strip a `namespace/` prefix, if any
pub fn strip_namespace(model: &str) -> &str {
    model.rsplit_once('/').map_or(model, |(_, name)| name)
}

/// Rank `available` by similarity to `model`, most similar first, capped at
/// [`MAX_SUGGESTIONS`]. Namespaces are ignored when scoring so `gpt-4o` ranks
/// `openai/gpt-4o` at the top.
pub fn rank_similar_models<'a, I>(model: &str, available: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let target = strip_namespace(model);
    let mut scored: Vec<(f64, &String)> = available
        .into_iter()
        .map(|candidate| (similarity_ratio(target, strip_namespace(candidate)), candidate))
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.cmp(b)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn ratio_is_case_insensitive() {
        assert!((similarity_ratio("GPT-4o", "gpt-4o") - 1.0).abs() < f64::EPSILON);
        assert!(similarity_ratio("gpt-4o", "claude-3") < 0.5);
    }

    #[test]
    fn ranking_is_capped_and_ordered() {
        let available: Vec<String> = [
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-2.0-flash",
            "gemini-1.5-pro",
            "gemini-1.5-flash",
            "text-embedding-004",
            "imagen-3",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let ranked = rank_similar_models("gemini-2.5-pro-x", &available);
        assert_eq!(ranked.len(), MAX_SUGGESTIONS);
        assert_eq!(ranked[0], "gemini-2.5-pro");
        assert!(!ranked.contains(&"imagen-3".to_string()));
    }

    #[test]
    fn ranking_ignores_namespace() {
        let available = vec!["openai/gpt-4o".to_string(), "anthropic/claude-3".to_string()];
        assert_eq!(rank_similar_models("gpt-4o", &available)[0], "openai/gpt-4o");
    }
}
