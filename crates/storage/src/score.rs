//! Fuzzy title matching: Sørensen-Dice over character bigrams blended with
//! Jaccard over tokens, both on normalized text.

use std::collections::HashSet;

/// Weight of the bigram Dice term in the blended score.
const DICE_WEIGHT: f64 = 0.6;
/// Weight of the token Jaccard term in the blended score.
const JACCARD_WEIGHT: f64 = 0.4;

/// Normalizes text for matching: lowercase, ASCII-fold German umlauts,
/// strip non-alphanumerics, collapse whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.to_lowercase().chars() {
        match ch {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'ß' => out.push_str("ss"),
            c if c.is_alphanumeric() => out.push(c),
            _ => {
                if !last_was_space {
                    out.push(' ');
                }
                last_was_space = true;
                continue;
            },
        }
        last_was_space = false;
    }
    out.trim_end().to_owned()
}

/// Character bigrams of a normalized string (whitespace excluded).
fn bigrams(normalized: &str) -> Vec<[char; 2]> {
    let chars: Vec<char> = normalized.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| [w[0], w[1]]).collect()
}

/// Sørensen-Dice coefficient over character bigrams.
fn dice(a: &str, b: &str) -> f64 {
    let ga = bigrams(a);
    let gb = bigrams(b);
    if ga.is_empty() && gb.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }
    if ga.is_empty() || gb.is_empty() {
        return 0.0;
    }
    // Distinct bigrams: each counts once per side.
    let set_a: HashSet<[char; 2]> = ga.into_iter().collect();
    let set_b: HashSet<[char; 2]> = gb.into_iter().collect();
    let matches = set_a.intersection(&set_b).count();
    2.0 * matches as f64 / (set_a.len() + set_b.len()) as f64
}

/// Jaccard similarity over whitespace tokens. Symmetric by construction.
fn jaccard(a: &str, b: &str) -> f64 {
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() && tb.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

/// Blended fuzzy score of two raw strings, bounded in [0, 1].
///
/// `0.6 · Dice(bigrams) + 0.4 · Jaccard(tokens)`, both over
/// [`normalize`]d text.
#[must_use]
pub fn fuzzy_score(query: &str, candidate: &str) -> f64 {
    let qa = normalize(query);
    let ca = normalize(candidate);
    DICE_WEIGHT.mul_add(dice(&qa, &ca), JACCARD_WEIGHT * jaccard(&qa, &ca))
}
