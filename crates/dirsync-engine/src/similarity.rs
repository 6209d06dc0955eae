//! Weighted fuzzy similarity for CRM role labels.
//!
//! Scores are 0-100. Short needles against long labels are scored by their
//! best-matching window, so `tech` matches `Technical contact`.

use strsim::normalized_levenshtein;

/// Lowercase, with every non-alphanumeric character turned into a space.
fn process(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn tokens(input: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = input.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

/// Plain edit-distance similarity.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Best ratio of the shorter string against every equally long window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    let long_chars: Vec<char> = long.chars().collect();
    if short_len == 0 || short_len == long_chars.len() {
        return ratio(short, long);
    }

    let mut best: f64 = 0.0;
    for start in 0..=(long_chars.len() - short_len) {
        let window: String = long_chars[start..start + short_len].iter().collect();
        best = best.max(ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn token_sort(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    scorer(&tokens(a).join(" "), &tokens(b).join(" "))
}

fn token_set(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    let common: Vec<&str> = ta.iter().copied().filter(|t| tb.contains(t)).collect();
    let only_a: Vec<&str> = ta.iter().copied().filter(|t| !tb.contains(t)).collect();
    let only_b: Vec<&str> = tb.iter().copied().filter(|t| !ta.contains(t)).collect();

    let base = common.join(" ");
    let with = |rest: &[&str]| {
        if rest.is_empty() {
            base.clone()
        } else if base.is_empty() {
            rest.join(" ")
        } else {
            format!("{base} {}", rest.join(" "))
        }
    };
    let combined_a = with(&only_a);
    let combined_b = with(&only_b);

    let mut best = scorer(&combined_a, &combined_b);
    if !base.is_empty() {
        best = best
            .max(scorer(&base, &combined_a))
            .max(scorer(&base, &combined_b));
    }
    best
}

/// Weighted similarity picking the best of full, partial and token-based scores.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = process(a);
    let b = process(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let base = ratio(&a, &b);
    let (la, lb) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = la.max(lb) / la.min(lb);

    let best = if len_ratio < 1.5 {
        base.max(token_sort(&a, &b, ratio) * 0.95)
            .max(token_set(&a, &b, ratio) * 0.95)
    } else {
        let scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
        base.max(partial_ratio(&a, &b) * scale)
            .max(token_sort(&a, &b, partial_ratio) * 0.95 * scale)
            .max(token_set(&a, &b, partial_ratio) * 0.95 * scale)
    };
    best.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels_match_needles() {
        assert!(weighted_ratio("tech", "Technical contact") >= 80);
        assert!(weighted_ratio("admin", "Administrative contact") >= 80);
        assert!(weighted_ratio("tech", "Tech") >= 80);
        assert!(weighted_ratio("admin", "Admin") >= 80);
    }

    #[test]
    fn test_unrelated_roles_do_not_match() {
        assert!(weighted_ratio("tech", "Administrative contact") < 80);
        assert!(weighted_ratio("admin", "Technical contact") < 80);
        assert!(weighted_ratio("tech", "Architect") < 80);
        assert!(weighted_ratio("tech", "Sales") < 80);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(weighted_ratio("tech", ""), 0);
        assert_eq!(weighted_ratio("tech", "--"), 0);
    }

    #[test]
    fn test_token_order_insensitive() {
        assert_eq!(weighted_ratio("contact technical", "technical contact"), 95);
    }

    #[test]
    fn test_partial_ratio_window() {
        assert_eq!(partial_ratio("tech", "technical contact"), 100.0);
        assert_eq!(partial_ratio("abc", "abc"), 100.0);
    }
}
