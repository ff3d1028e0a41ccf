//! Core function library.

use crate::XPathError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    String,
    Concat,
    NormalizeSpace,
    Contains,
    StartsWith,
    SubstringBefore,
    SubstringAfter,
    Substring,
    Translate,
    StringLength,
    Name,
    LocalName,
    Count,
    Position,
    Last,
    Not,
    True,
    False,
    Boolean,
    Number,
}

impl Function {
    /// Resolves a function by name and checks its argument count.
    pub(crate) fn resolve(name: &str, argc: usize) -> Result<Self, XPathError> {
        let (function, min, max) = match name {
            "string" => (Self::String, 0, 1),
            "concat" => (Self::Concat, 2, usize::MAX),
            "normalize-space" => (Self::NormalizeSpace, 0, 1),
            "contains" => (Self::Contains, 2, 2),
            "starts-with" => (Self::StartsWith, 2, 2),
            "substring-before" => (Self::SubstringBefore, 2, 2),
            "substring-after" => (Self::SubstringAfter, 2, 2),
            "substring" => (Self::Substring, 2, 3),
            "translate" => (Self::Translate, 3, 3),
            "string-length" => (Self::StringLength, 0, 1),
            "name" => (Self::Name, 0, 1),
            "local-name" => (Self::LocalName, 0, 1),
            "count" => (Self::Count, 1, 1),
            "position" => (Self::Position, 0, 0),
            "last" => (Self::Last, 0, 0),
            "not" => (Self::Not, 1, 1),
            "true" => (Self::True, 0, 0),
            "false" => (Self::False, 0, 0),
            "boolean" => (Self::Boolean, 1, 1),
            "number" => (Self::Number, 0, 1),
            _ => return Err(XPathError::UnknownFunction(name.to_string())),
        };

        if argc < min || argc > max {
            let expected = match (min, max) {
                (min, max) if min == max => min.to_string(),
                (min, usize::MAX) => format!("at least {min}"),
                (min, max) => format!("{min} to {max}"),
            };
            return Err(XPathError::Arity {
                function: name.to_string(),
                expected,
                found: argc,
            });
        }

        Ok(function)
    }
}

/// XPath `translate()`: maps each char of `from` to the char at the same
/// position in `to`, dropping chars beyond the length of `to`.
pub(crate) fn translate(input: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    input
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(index) => to.get(index).copied(),
            None => Some(c),
        })
        .collect()
}

/// XPath `substring()` with its 1-based, rounded positions.
pub(crate) fn substring(input: &str, start: f64, length: Option<f64>) -> String {
    let start = start.round();
    let end = match length {
        Some(length) => start + length.round(),
        None => f64::INFINITY,
    };
    if start.is_nan() || end.is_nan() {
        return String::new();
    }
    input
        .chars()
        .enumerate()
        .filter(|(index, _)| {
            let position = (*index + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// XPath `number()` applied to a string.
pub(crate) fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || c == '.' || (i == 0 && c == '-'));
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_checks_arity() {
        assert_eq!(Function::resolve("concat", 3), Ok(Function::Concat));
        assert_eq!(
            Function::resolve("concat", 1),
            Err(XPathError::Arity {
                function: "concat".into(),
                expected: "at least 2".into(),
                found: 1,
            })
        );
        assert!(matches!(
            Function::resolve("substring", 4),
            Err(XPathError::Arity { .. })
        ));
    }

    #[test]
    fn test_translate_drops_unmapped() {
        assert_eq!(translate("a-b-c", "-c", "_"), "a_b_");
    }

    #[test]
    fn test_substring_rounding() {
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 4.0, None), "45");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("").is_nan());
    }
}
