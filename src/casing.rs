//! Key casing translation between the wire format and local field names.
//!
//! The service capitalizes every word of a JSON key (`MessageID`, `BouncedAt`)
//! while local records use `snake_case` (`message_id`, `bounced_at`). A plain
//! camel-to-snake conversion breaks on acronyms, so [`KeyTranslator`] keeps a
//! table of abbreviations that are spelled in capitals on the wire.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Abbreviations the service spells in capitals, as `(local, wire)` pairs.
const DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("cname", "CNAME"),
    ("css", "CSS"),
    ("dkim", "DKIM"),
    ("html", "HTML"),
    ("id", "ID"),
    ("ip", "IP"),
    ("spf", "SPF"),
];

/// Bidirectional key translator driven by an abbreviation table.
///
/// Use [`KeyTranslator::default`] for the built-in table and
/// [`KeyTranslator::with_abbreviation`] to teach it new acronyms.
///
/// # Examples
/// ```
/// use postmark_client::KeyTranslator;
///
/// let keys = KeyTranslator::default();
/// assert_eq!(keys.wire_key("message_id"), "MessageID");
/// assert_eq!(keys.local_key("MessageID"), "message_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTranslator {
    /// Lower-case local token to its wire spelling.
    abbreviations: BTreeMap<String, String>,
}

impl Default for KeyTranslator {
    fn default() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS
                .iter()
                .map(|(local, wire)| (local.to_string(), wire.to_string()))
                .collect(),
        }
    }
}

impl KeyTranslator {
    /// Create a translator with an empty abbreviation table.
    ///
    /// Every word is then title-cased on the way out and split on plain case
    /// boundaries on the way in.
    pub fn empty() -> Self {
        Self {
            abbreviations: BTreeMap::new(),
        }
    }

    /// Add (or replace) an abbreviation.
    ///
    /// `local` is matched case-insensitively against underscore-separated
    /// tokens; `wire` is the exact spelling used by the service and should be
    /// upper-case for the reverse scan to recognize it.
    pub fn with_abbreviation(mut self, local: impl Into<String>, wire: impl Into<String>) -> Self {
        self.abbreviations
            .insert(local.into().to_lowercase(), wire.into());
        self
    }

    /// Remove an abbreviation from the table.
    pub fn without_abbreviation(mut self, local: &str) -> Self {
        self.abbreviations.remove(&local.to_lowercase());
        self
    }

    /// Iterate over the `(local, wire)` abbreviation pairs.
    pub fn abbreviations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.abbreviations
            .iter()
            .map(|(local, wire)| (local.as_str(), wire.as_str()))
    }

    /// Translate a local key (`bounced_at`) to its wire spelling (`BouncedAt`).
    ///
    /// Keys that already contain an upper-case character are assumed to be
    /// wire keys and are returned unchanged.
    pub fn wire_key(&self, local: &str) -> String {
        if local.chars().any(char::is_uppercase) {
            return local.to_string();
        }

        let wire: String = local
            .split('_')
            .filter(|token| !token.is_empty())
            .map(|token| match self.abbreviations.get(token) {
                Some(spelling) => spelling.clone(),
                None => capitalize(token),
            })
            .collect();

        if wire.is_empty() {
            local.to_string()
        } else {
            wire
        }
    }

    /// Translate a wire key (`MessageID`) to its local spelling (`message_id`).
    ///
    /// Keys without any upper-case character are returned unchanged.
    pub fn local_key(&self, wire: &str) -> String {
        if !wire.chars().any(char::is_uppercase) {
            return wire.to_string();
        }
        self.split_words(wire).join("_")
    }

    /// Translate every key of a local value to wire casing, recursing into
    /// nested objects and arrays.
    pub fn to_wire(&self, value: &Value) -> Value {
        self.rename_keys(value, &|key| self.wire_key(key))
    }

    /// Translate every key of a wire value to local casing, recursing into
    /// nested objects and arrays.
    pub fn to_local(&self, value: &Value) -> Value {
        self.rename_keys(value, &|key| self.local_key(key))
    }

    fn rename_keys(&self, value: &Value, rename: &dyn Fn(&str) -> String) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, nested)| (rename(key), self.rename_keys(nested, rename)))
                    .collect::<Map<String, Value>>(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.rename_keys(item, rename))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    /// Scan a wire key for word boundaries and return lower-cased words.
    fn split_words(&self, key: &str) -> Vec<String> {
        let chars: Vec<char> = key.chars().collect();
        let mut words = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let c = chars[start];
            if !c.is_alphanumeric() {
                start += 1;
                continue;
            }

            let end = if c.is_uppercase() {
                match self.abbreviation_at(&chars, start) {
                    Some(len) => start + len,
                    None => capitalized_word_end(&chars, start),
                }
            } else {
                lower_run_end(&chars, start + 1)
            };

            words.push(chars[start..end].iter().collect::<String>().to_lowercase());
            start = end;
        }

        words
    }

    /// Length of the longest abbreviation spelled at `start`, if any.
    ///
    /// A match followed by a lower-case letter is rejected, since that letter
    /// belongs to the abbreviation's last capital (`IDentity` is not `ID`).
    fn abbreviation_at(&self, chars: &[char], start: usize) -> Option<usize> {
        self.abbreviations
            .values()
            .filter_map(|spelling| {
                let spelling: Vec<char> = spelling.chars().collect();
                let end = start + spelling.len();
                if spelling.is_empty() || end > chars.len() || chars[start..end] != spelling[..] {
                    return None;
                }
                match chars.get(end) {
                    Some(next) if next.is_lowercase() => None,
                    _ => Some(spelling.len()),
                }
            })
            .max()
    }
}

/// End of a word starting with a capital letter at `start`.
///
/// A run of capitals followed by a lower-case letter hands its last capital to
/// the next word (`XMLHttp` splits as `XML` + `Http`).
fn capitalized_word_end(chars: &[char], start: usize) -> usize {
    let mut end = start + 1;
    while end < chars.len() && chars[end].is_uppercase() {
        end += 1;
    }

    if end - start > 1 {
        if chars.get(end).is_some_and(|c| c.is_lowercase()) {
            return end - 1;
        }
        return end;
    }

    lower_run_end(chars, end)
}

fn lower_run_end(chars: &[char], from: usize) -> usize {
    let mut end = from;
    while end < chars.len() && (chars[end].is_lowercase() || chars[end].is_ascii_digit()) {
        end += 1;
    }
    end
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
