//! Directory-safe identifiers from free-text names.

use deunicode::deunicode_with_tofu;

/// Leading name tokens skipped when deriving an account identifier.
const PARTICLES: [&str; 4] = ["de", "della", "von", "und"];

/// Characters dropped from identifier tokens.
const DROPPED: [char; 3] = ['\'', '.', '!'];

/// Per-token cap, in characters, before transliteration.
const TOKEN_CAP: usize = 10;

/// Transliterate to ASCII.
///
/// Every character gets its closest ASCII rendition, so Cyrillic, Greek
/// and CJK names keep a readable form. Characters with no rendition are
/// dropped.
pub fn transliterate(input: &str) -> String {
    deunicode_with_tofu(input, "")
}

/// Directory-safe form of a project or tenant name.
///
/// Total and deterministic: transliterates, then maps spaces to `.` and
/// apostrophes to `_`. Applying it twice gives the same result.
pub fn sanitize(name: &str) -> String {
    transliterate(name)
        .chars()
        .map(|c| match c {
            ' ' => '.',
            '\'' => '_',
            other => other,
        })
        .collect()
}

/// First non-particle token of a personal name, as used in account
/// identifiers: lowercased, capped, transliterated and stripped of `'.!`
/// and whitespace.
///
/// Returns `None` when nothing usable remains.
pub fn name_token(name: &str) -> Option<String> {
    let token = name
        .split_whitespace()
        .flat_map(|part| part.split('-'))
        .filter(|part| !part.is_empty())
        .find(|part| !PARTICLES.contains(&part.to_lowercase().as_str()))?;

    let capped: String = token.to_lowercase().chars().take(TOKEN_CAP).collect();
    let token: String = transliterate(&capped)
        .to_lowercase()
        .chars()
        .filter(|c| !DROPPED.contains(c) && !c.is_whitespace())
        .collect();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_substitutions() {
        assert_eq!(sanitize("Acme Cloud"), "Acme.Cloud");
        assert_eq!(sanitize("O'Brien Labs"), "O_Brien.Labs");
        assert_eq!(sanitize("Hämeenlinna Ympäristö"), "Hameenlinna.Ymparisto");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in ["Åbo Akademi", "L'Oréal R&D", "Straße 5", "plain"] {
            let once = sanitize(name);
            assert_eq!(sanitize(&once), once);
            assert!(once.is_ascii());
        }
    }

    #[test]
    fn test_sanitize_non_latin_names() {
        assert_eq!(sanitize("Ελλάδα"), "Ellada");
        assert!(sanitize("Проект Альфа").starts_with("Proekt."));
        for name in ["Проект", "Альфа", "项目", "Ελλάδα"] {
            let cn = sanitize(name);
            assert!(!cn.is_empty(), "{name} sanitized to nothing");
            assert!(cn.is_ascii());
        }
        assert_ne!(sanitize("Проект"), sanitize("Альфа"));
    }

    #[test]
    fn test_transliterate_folds_letters_without_decomposition() {
        assert_eq!(transliterate("Søren Łukasz Straße"), "Soren Lukasz Strasse");
        assert_eq!(transliterate("Þór"), "Thor");
    }

    #[test]
    fn test_name_token_skips_particles() {
        assert_eq!(name_token("de la Cruz").as_deref(), Some("la"));
        assert_eq!(name_token("von Neumann").as_deref(), Some("neumann"));
        assert_eq!(name_token("Della Von Und Berg").as_deref(), Some("berg"));
    }

    #[test]
    fn test_name_token_splits_hyphens_and_caps() {
        assert_eq!(name_token("Jean-Pierre").as_deref(), Some("jean"));
        assert_eq!(
            name_token("Wolfeschlegelsteinhausen").as_deref(),
            Some("wolfeschle")
        );
        assert_eq!(name_token("O'Neil").as_deref(), Some("oneil"));
        assert_eq!(name_token("Jérôme").as_deref(), Some("jerome"));
        assert_eq!(name_token("Анна").as_deref(), Some("anna"));
        assert_eq!(name_token("Игорь").as_deref(), Some("igor"));
    }

    #[test]
    fn test_name_token_empty() {
        assert_eq!(name_token(""), None);
        assert_eq!(name_token("von"), None);
        assert_eq!(name_token("!!"), None);
    }
}
