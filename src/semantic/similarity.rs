//! String and vector similarity.

/// Cosine similarity of two embedding vectors.
///
/// Returns 0.0 on length mismatch, empty input, or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Levenshtein edit distance over chars, two-row DP.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1]
            } else {
                1 + prev[j].min(curr[j - 1]).min(prev[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Typo-tolerant similarity: `1 - distance / max_len`.
///
/// Pairs whose lengths differ by more than half the longer string score 0.0
/// without computing the distance.
pub fn fuzzy_score(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }

    let m = a.chars().count();
    let n = b.chars().count();
    let max_len = m.max(n);
    if m.abs_diff(n) as f32 > max_len as f32 * 0.5 {
        return 0.0;
    }

    1.0 - levenshtein(&a, &b) as f32 / max_len as f32
}

/// Lowercased word tokens. Apostrophes stay inside words ("don't").
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("smoke", "smoke"), 0);
    }

    #[test]
    fn fuzzy_tolerates_typos() {
        assert!((fuzzy_score("diabetis", "diabetes") - 0.875).abs() < 1e-6);
        assert_eq!(fuzzy_score("Male", "male"), 1.0);
        // too different in length to bother
        assert_eq!(fuzzy_score("no", "never touched a cigarette"), 0.0);
        assert_eq!(fuzzy_score("", "x"), 0.0);
    }

    #[test]
    fn tokenize_keeps_contractions() {
        assert_eq!(tokenize("I don't smoke."), vec!["i", "don't", "smoke"]);
        assert_eq!(tokenize("rice, beans & greens"), vec!["rice", "beans", "greens"]);
    }
}
