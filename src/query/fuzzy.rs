//! Edit-distance similarity for approximate text criteria.

/// Default similarity a fuzzy criterion must reach.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

/// Levenshtein distance over Unicode scalar values.
///
/// Full dynamic-programming matrix of `(len(source)+1) x (len(target)+1)`;
/// insertion, deletion and substitution each cost 1.
#[must_use]
pub fn levenshtein(source: &str, target: &str) -> usize {
    let source: Vec<char> = source.chars().collect();
    let target: Vec<char> = target.chars().collect();
    let rows = source.len() + 1;
    let cols = target.len() + 1;

    let mut matrix = vec![vec![0usize; cols]; rows];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..rows {
        for j in 1..cols {
            let cost = usize::from(source[i - 1] != target[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[rows - 1][cols - 1]
}

/// Normalized similarity in `[0, 1]`: `1 - distance / max(len)`.
///
/// Identical strings (including two empty strings) score 1.0; an empty
/// string against a non-empty one scores 0.0.
#[must_use]
pub fn similarity(source: &str, target: &str) -> f64 {
    if source == target {
        return 1.0;
    }
    let source_len = source.chars().count();
    let target_len = target.chars().count();
    if source_len == 0 || target_len == 0 {
        return 0.0;
    }

    let longest = source_len.max(target_len);
    #[allow(clippy::cast_precision_loss)]
    let ratio = levenshtein(source, target) as f64 / longest as f64;
    1.0 - ratio
}

/// Best similarity between `needle` and either the whole `haystack` or
/// any of its whitespace-separated tokens.
///
/// Lets "Hotell" match "Grand Hotel" through its token "Hotel".
#[must_use]
pub fn best_similarity(needle: &str, haystack: &str, case_sensitive: bool) -> f64 {
    let (needle, haystack) = if case_sensitive {
        (needle.to_string(), haystack.to_string())
    } else {
        (needle.to_lowercase(), haystack.to_lowercase())
    };

    haystack
        .split_whitespace()
        .map(|token| similarity(&needle, token))
        .fold(similarity(&needle, &haystack), f64::max)
}
