use crate::path::PathError;

///
/// Token
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Token<'a> {
    pub(super) kind: TokenKind<'a>,
    pub(super) offset: usize,
}

///
/// TokenKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum TokenKind<'a> {
    /// Keyword or property name.
    Ident(&'a str),
    /// Text between `(` and `)`, undecoded.
    Key(&'a str),
    Slash,
    /// `$`-prefixed path option such as `$value`.
    Option(&'a str),
}

const fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

const fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Split a path into tokens. Offsets are byte offsets into `input`.
pub(super) fn tokenize(input: &str) -> Result<Vec<Token<'_>>, PathError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let kind = match bytes[pos] {
            b'/' => {
                pos += 1;
                TokenKind::Slash
            }
            b'(' => {
                let Some(len) = input[pos + 1..].find(')') else {
                    return Err(PathError::syntax(input, start, "unterminated id key"));
                };
                if len == 0 {
                    return Err(PathError::syntax(input, start, "empty id key"));
                }
                pos += len + 2;
                TokenKind::Key(&input[start + 1..start + 1 + len])
            }
            b'$' => {
                pos += 1;
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                if pos == start + 1 {
                    return Err(PathError::syntax(input, start, "expected option name after '$'"));
                }
                TokenKind::Option(&input[start..pos])
            }
            byte if is_ident_start(byte) => {
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                TokenKind::Ident(&input[start..pos])
            }
            _ => {
                let found = input[start..].chars().next().unwrap_or_default();
                return Err(PathError::syntax(
                    input,
                    start,
                    format!("unexpected character '{found}'"),
                ));
            }
        };

        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    Ok(tokens)
}
