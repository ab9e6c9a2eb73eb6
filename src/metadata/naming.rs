use convert_case::{Case, Casing};
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

const BLUEPRINT_SUFFIX: &str = "Blueprint";

/// Returns true when `name` can be used verbatim as a table or column name.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Derives the storage table name for a blueprint.
///
/// Strips a trailing `Blueprint`, converts to snake_case, then pluralizes
/// the last word: `UserAccountBlueprint` -> `user_accounts`.
pub fn table_name_for(blueprint_name: &str) -> String {
    let base = blueprint_name
        .strip_suffix(BLUEPRINT_SUFFIX)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(blueprint_name);
    pluralize(&base.to_case(Case::Snake))
}

fn pluralize(word: &str) -> String {
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before_vowel = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !before_vowel && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }

    format!("{}s", word)
}

/// Generates a default index name.
///
/// Format: `idx_<table>_<column>`
pub fn default_index_name(table_name: &str, column_name: &str) -> String {
    format!("idx_{}_{}", table_name, column_name)
}

/// Generates a new synthetic record identifier (UUID v4).
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}
