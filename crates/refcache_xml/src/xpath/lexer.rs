//! Path-expression tokenizer.

use crate::XPathError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Pipe,
    Dot,
    DotDot,
    Star,
    DoubleColon,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Literal(String),
    Number(f64),
    Variable(String),
    Name(String),
}

/// A token with the character offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, XPathError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        let peek = chars.get(i + 1).copied();

        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if peek == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '*' => {
                i += 1;
                Token::Star
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if peek == Some('=') => {
                i += 2;
                Token::NotEq
            }
            '<' if peek == Some('=') => {
                i += 2;
                Token::Le
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if peek == Some('=') => {
                i += 2;
                Token::Ge
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            ':' if peek == Some(':') => {
                i += 2;
                Token::DoubleColon
            }
            '.' if peek == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if !peek.is_some_and(|p| p.is_ascii_digit()) => {
                i += 1;
                Token::Dot
            }
            '\'' | '"' => {
                let quote = c;
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == quote)
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| XPathError::syntax(source, start, "unterminated string literal"))?;
                let literal: String = chars[i + 1..end].iter().collect();
                i = end + 1;
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| XPathError::syntax(source, start, format!("invalid number '{text}'")))?;
                Token::Number(value)
            }
            '$' => {
                i += 1;
                let name = read_qname(&chars, &mut i);
                if name.is_empty() {
                    return Err(XPathError::syntax(source, start, "expected variable name after '$'"));
                }
                Token::Variable(name)
            }
            c if is_name_start(c) => Token::Name(read_qname(&chars, &mut i)),
            other => {
                return Err(XPathError::syntax(
                    source,
                    start,
                    format!("unexpected character '{other}'"),
                ));
            }
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

/// Reads `name` or `prefix:name`. A `::` axis separator is never consumed.
fn read_qname(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    if *i < chars.len() && is_name_start(chars[*i]) {
        *i += 1;
        while *i < chars.len() && is_name_char(chars[*i]) {
            *i += 1;
        }
        let prefixed = chars.get(*i) == Some(&':')
            && chars.get(*i + 1).is_some_and(|&c| is_name_start(c));
        if prefixed {
            *i += 1;
            while *i < chars.len() && is_name_char(chars[*i]) {
                *i += 1;
            }
        }
    }
    chars[start..*i].iter().collect()
}
