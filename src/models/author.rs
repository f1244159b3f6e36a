//! Author model and name normalization

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

/// Author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
}

/// Normalize an author name token for uniqueness: NFC form, collapsed
/// whitespace, each word title-cased.
pub fn normalize_name(raw: &str) -> String {
    raw.nfc()
        .collect::<String>()
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split a comma-separated author list into normalized tokens,
/// dropping empties.
pub fn split_author_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_name)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_cases() {
        assert_eq!(normalize_name("ursula k. le guin"), "Ursula K. Le Guin");
        assert_eq!(normalize_name("  FRANK   HERBERT "), "Frank Herbert");
    }

    #[test]
    fn test_split_author_list() {
        assert_eq!(
            split_author_list("frank herbert, kevin j. anderson"),
            vec!["Frank Herbert", "Kevin J. Anderson"]
        );
        assert_eq!(split_author_list(" , "), Vec::<String>::new());
    }
}
