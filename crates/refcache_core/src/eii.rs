//! Repair of mis-encoded explicit interface implementation keys.
//!
//! Some comment files record dictionary-shaped explicit implementations of
//! `IDictionary<TKey, TValue>` and `ICollection<KeyValuePair<TKey, TValue>>`
//! members with the implementing type's own generic arguments, while the
//! data uses the interface's placeholders joined by `@`. For example:
//!
//! ```text
//! M:N.Map`2.System#Collections#Generic#IDictionary{K,V}#Add(`0,`1)
//! M:N.Map`2.System#Collections#Generic#IDictionary{TKey@TValue}#Add(`0,`1)
//! ```
//!
//! This is a narrow workaround for that one pattern, not a general key
//! parser.

use std::sync::LazyLock;

use regex::Regex;

static DICTIONARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\.System#Collections#Generic#IDictionary\{)[^{}]*(\}#)")
        .expect("valid dictionary EII pattern")
});

static KEY_VALUE_COLLECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\.System#Collections#Generic#ICollection\{System#Collections#Generic#KeyValuePair\{)[^{}]*(\}\}#)",
    )
    .expect("valid key/value collection EII pattern")
});

const PLACEHOLDERS: &str = "${1}TKey@TValue${2}";

/// Rewrites a method key into the form the data uses.
///
/// Returns `None` for non-method keys and for keys neither pattern
/// changes.
pub fn repair_key(key: &str) -> Option<String> {
    if !key.starts_with("M:") {
        return None;
    }

    let repaired = DICTIONARY.replace(key, PLACEHOLDERS);
    let repaired = KEY_VALUE_COLLECTION.replace(&repaired, PLACEHOLDERS);

    (repaired != key).then(|| repaired.into_owned())
}
