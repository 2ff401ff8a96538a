//! Entity naming and unique ids
//!
//! Unique ids are persisted by the host and key every entity's history, so
//! the functions here must produce the same bytes for the same inputs on
//! every run.

use amc_core::AmcEntry;
use serde::{Deserialize, Serialize};

/// Slugify text the way the host does for ids
///
/// Transliterates to ASCII, lowercases and collapses every run of other
/// characters into a single `_`. Non-empty text that leaves nothing behind
/// becomes `unknown`.
pub fn slugify(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let slug = slug::slugify(strip_digit_separators(text)).replace('-', "_");
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Drop commas between digits so `1,000` slugs as `1000`
fn strip_digit_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            let between_digits = i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(char::is_ascii_digit);
            !(c == ',' && between_digits)
        })
        .map(|(_, &c)| c)
        .collect()
}

fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c| c == '_' || c == ' ')
}

/// Human name: `"<prefix> <entry name>"`, trimmed
///
/// An entry without a name falls back to `"<type_name> <index>"`.
pub fn display_name(name_prefix: &str, entry: &AmcEntry, type_name: &str) -> String {
    let entry_name = match entry.name_str() {
        Some(name) => name.to_string(),
        None => format!("{} {}", type_name, entry.index_label()),
    };
    format!("{} {}", name_prefix.trim(), entry_name.trim())
        .trim()
        .to_string()
}

/// Per-entity-family id prefix, ending in `_` unless empty
pub fn derived_id_prefix(name_prefix: &str, id_prefix: &str) -> String {
    let mut prefix = id_prefix.to_string();
    // Raw length: a blank name prefix still takes this branch
    if !name_prefix.is_empty() {
        let slug = slugify(&name_prefix.trim().to_lowercase());
        prefix = trim_separators(&format!("{id_prefix}_{slug}")).to_string();
    }
    if prefix.is_empty() {
        prefix
    } else {
        format!("{}_", trim_separators(&prefix))
    }
}

/// Unique id suffix: the entry `Id`, or `"<type_name><index>"` without one
pub fn unique_id_suffix(entry: &AmcEntry, type_name: &str) -> String {
    match entry.id_str() {
        Some(id) => id.to_string(),
        None => format!("{}{}", type_name, entry.index_label()),
    }
}

/// Full unique id: coordinator prefix, derived prefix, suffix
pub fn unique_id(
    coordinator_prefix: &str,
    name_prefix: &str,
    id_prefix: &str,
    entry: &AmcEntry,
    type_name: &str,
) -> String {
    format!(
        "{}{}{}",
        coordinator_prefix,
        derived_id_prefix(name_prefix, id_prefix),
        unique_id_suffix(entry, type_name)
    )
}

/// Identity fixed at creation; never recomputed on refresh
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub unique_id: String,
    pub name: String,
}

impl EntityIdentity {
    pub fn new(
        coordinator_prefix: &str,
        name_prefix: &str,
        id_prefix: &str,
        entry: &AmcEntry,
        type_name: &str,
    ) -> Self {
        Self {
            unique_id: unique_id(coordinator_prefix, name_prefix, id_prefix, entry, type_name),
            name: display_name(name_prefix, entry, type_name),
        }
    }
}
