//! Journal entry formatting.
//!
//! An entry is one line: a command tag character, the field delimiter,
//! then the command's arguments as length-prefixed tokens. A token is
//! `<decimal-byte-length>;<raw-bytes>;`, so a payload may contain the
//! delimiter without any escaping.

use std::fmt::Display;

use crate::error::{StoreError, StoreResult};

/// Field delimiter between the tag, token lengths and token payloads.
pub const DELIMITER: char = ';';

/// A single journaled mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Append { text: String },
    Overwrite { index: usize, text: String },
    Erase { index: usize },
    Clear,
}

impl Command {
    /// Tag character identifying this command in a journal entry.
    pub fn tag(&self) -> char {
        match self {
            Command::Append { .. } => 'A',
            Command::Clear => 'C',
            Command::Erase { .. } => 'E',
            Command::Overwrite { .. } => 'O',
        }
    }

    /// Encode this command as one journal line (without the newline).
    pub fn encode(&self) -> String {
        let mut entry = String::new();
        entry.push(self.tag());
        entry.push(DELIMITER);

        match self {
            Command::Append { text } => entry.push_str(&encode_token(text)),
            Command::Overwrite { index, text } => {
                entry.push_str(&encode_token(index));
                entry.push_str(&encode_token(text));
            }
            Command::Erase { index } => entry.push_str(&encode_token(index)),
            Command::Clear => {}
        }

        entry
    }

    /// Decode one journal line.
    ///
    /// Returns `Ok(None)` when the line's arguments are truncated or
    /// unparsable; the torn tail of a crashed journal must not poison
    /// the entries before it. An unknown tag character is corruption of
    /// a different kind and fails the whole replay.
    pub fn decode(line: &str) -> StoreResult<Option<Command>> {
        let bytes = line.as_bytes();
        let Some(&tag) = bytes.first() else {
            return Ok(None);
        };

        // Tokens start right after the tag and its delimiter.
        let mut tokens = TokenCursor::new(bytes, 2);

        let command = match tag {
            b'A' => tokens.next_token().map(|text| Command::Append { text }),
            b'C' => Some(Command::Clear),
            b'E' => tokens
                .next_token()
                .and_then(|raw| raw.parse().ok())
                .map(|index| Command::Erase { index }),
            b'O' => {
                let index = tokens.next_token().and_then(|raw| raw.parse().ok());
                let text = tokens.next_token();
                index
                    .zip(text)
                    .map(|(index, text)| Command::Overwrite { index, text })
            }
            other => return Err(StoreError::InvalidCommand(other as char)),
        };

        Ok(command)
    }
}

/// Serialize one argument as a length-prefixed token.
fn encode_token(value: impl Display) -> String {
    let text = value.to_string();
    format!("{}{DELIMITER}{text}{DELIMITER}", text.len())
}

/// Cursor over the token stream of a single journal entry.
struct TokenCursor<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(line: &'a [u8], pos: usize) -> Self {
        TokenCursor { line, pos }
    }

    /// Extract the next token, or `None` once the stream ends or turns
    /// invalid: no delimiter left, a non-numeric length field, or fewer
    /// bytes remaining than the declared length plus its trailing
    /// delimiter.
    fn next_token(&mut self) -> Option<String> {
        let rest = self.line.get(self.pos..)?;
        let delimiter = rest.iter().position(|&b| b == DELIMITER as u8)?;

        let length_field = &rest[..delimiter];
        if length_field.is_empty() || !length_field.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let length: usize = std::str::from_utf8(length_field).ok()?.parse().ok()?;

        let value_start = delimiter + 1;
        if rest.len() - value_start <= length {
            return None;
        }

        let value = rest[value_start..value_start + length].to_vec();
        self.pos += value_start + length + 1;
        String::from_utf8(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_append() {
        let command = Command::Append {
            text: "alpha".to_string(),
        };
        assert_eq!(command.encode(), "A;5;alpha;");
    }

    #[test]
    fn test_encode_overwrite_has_two_tokens() {
        let command = Command::Overwrite {
            index: 10,
            text: "beta".to_string(),
        };
        assert_eq!(command.encode(), "O;2;10;4;beta;");
    }

    #[test]
    fn test_encode_clear_has_no_tokens() {
        assert_eq!(Command::Clear.encode(), "C;");
    }

    #[test]
    fn test_decode_round_trip() {
        let commands = vec![
            Command::Append {
                text: "hello world".to_string(),
            },
            Command::Append {
                text: String::new(),
            },
            Command::Overwrite {
                index: 3,
                text: "x".to_string(),
            },
            Command::Erase { index: 0 },
            Command::Clear,
        ];

        for command in commands {
            let decoded = Command::decode(&command.encode()).unwrap();
            assert_eq!(decoded, Some(command));
        }
    }

    #[test]
    fn test_decode_payload_containing_delimiter() {
        let decoded = Command::decode("A;5;a;b;c;").unwrap();
        assert_eq!(
            decoded,
            Some(Command::Append {
                text: "a;b;c".to_string()
            })
        );
    }

    #[test]
    fn test_decode_truncated_value_is_dropped() {
        // Torn mid-value: declared length exceeds what is left.
        assert_eq!(Command::decode("A;11;hello wo").unwrap(), None);
        // Value present but the trailing delimiter is missing.
        assert_eq!(Command::decode("A;4;beta").unwrap(), None);
    }

    #[test]
    fn test_decode_overwrite_with_missing_text_is_dropped() {
        assert_eq!(Command::decode("O;1;4;").unwrap(), None);
    }

    #[test]
    fn test_decode_non_numeric_length_is_dropped() {
        assert_eq!(Command::decode("A;x;abc;").unwrap(), None);
        assert_eq!(Command::decode("A;;abc;").unwrap(), None);
    }

    #[test]
    fn test_decode_non_numeric_index_is_dropped() {
        assert_eq!(Command::decode("E;3;abc;").unwrap(), None);
    }

    #[test]
    fn test_decode_missing_arguments_is_dropped() {
        assert_eq!(Command::decode("A;").unwrap(), None);
        assert_eq!(Command::decode("E;").unwrap(), None);
    }

    #[test]
    fn test_decode_unknown_tag_fails() {
        assert!(matches!(
            Command::decode("X;3;abc;"),
            Err(StoreError::InvalidCommand('X'))
        ));
    }

    #[test]
    fn test_decode_empty_line_is_dropped() {
        assert_eq!(Command::decode("").unwrap(), None);
    }
}
