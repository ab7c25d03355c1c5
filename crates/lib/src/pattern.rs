//! SIS user id patterns.
//!
//! A pattern is a printf-style template with exactly one integer placeholder,
//! for example `Canvas-%05d`. The placeholder accepts an optional `0` flag and
//! a minimum width; `%%` is a literal percent sign. Widths pad, they never
//! truncate: `Canvas-%05d` renders user 123456 as `Canvas-123456`.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::UserId;

/// Pattern used when none is configured.
pub const DEFAULT_PATTERN: &str = "Canvas-%05d";

/// Widest field a placeholder may ask for.
pub const MAX_WIDTH: usize = 64;

/// Errors produced while parsing a pattern.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Pattern '{pattern}' has no integer placeholder")]
    MissingPlaceholder { pattern: String },

    #[error("Pattern '{pattern}' has more than one placeholder")]
    MultiplePlaceholders { pattern: String },

    #[error("Pattern '{pattern}' has unsupported directive at byte {position}")]
    UnsupportedDirective { pattern: String, position: usize },

    #[error("Pattern '{pattern}' ends inside a directive")]
    UnterminatedDirective { pattern: String },

    #[error("Pattern '{pattern}' asks for a field wider than {max}")]
    WidthTooLarge { pattern: String, max: usize },
}

impl From<PatternError> for crate::Error {
    fn from(err: PatternError) -> Self {
        crate::Error::Pattern(err)
    }
}

/// A parsed SIS user id pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPattern {
    source: String,
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
}

impl IdPattern {
    /// Parses a pattern, requiring exactly one integer placeholder.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut placeholder: Option<(usize, bool)> = None;

        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let ch = pattern[i..].chars().next().unwrap_or_default();
            if ch != '%' {
                let target = if placeholder.is_some() {
                    &mut suffix
                } else {
                    &mut prefix
                };
                target.push(ch);
                i += ch.len_utf8();
                continue;
            }

            let start = i;
            i += 1;
            if bytes.get(i) == Some(&b'%') {
                if placeholder.is_some() {
                    suffix.push('%');
                } else {
                    prefix.push('%');
                }
                i += 1;
                continue;
            }

            let zero_pad = bytes.get(i) == Some(&b'0');
            if zero_pad {
                i += 1;
            }
            let digits_start = i;
            while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
            let width = if digits_start == i {
                0
            } else {
                pattern[digits_start..i]
                    .parse::<usize>()
                    .ok()
                    .filter(|width| *width <= MAX_WIDTH)
                    .ok_or_else(|| PatternError::WidthTooLarge {
                        pattern: pattern.to_string(),
                        max: MAX_WIDTH,
                    })?
            };

            match bytes.get(i) {
                Some(b'd') | Some(b'i') => {
                    if placeholder.is_some() {
                        return Err(PatternError::MultiplePlaceholders {
                            pattern: pattern.to_string(),
                        });
                    }
                    placeholder = Some((width, zero_pad));
                    i += 1;
                }
                Some(_) => {
                    return Err(PatternError::UnsupportedDirective {
                        pattern: pattern.to_string(),
                        position: start,
                    });
                }
                None => {
                    return Err(PatternError::UnterminatedDirective {
                        pattern: pattern.to_string(),
                    });
                }
            }
        }

        let (width, zero_pad) = placeholder.ok_or_else(|| PatternError::MissingPlaceholder {
            pattern: pattern.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Renders the SIS user id for a user.
    pub fn format(&self, user_id: UserId) -> String {
        let raw = user_id.get();
        let width = self.width;
        let number = if self.zero_pad {
            format!("{raw:0width$}")
        } else {
            format!("{raw:>width$}")
        };
        format!("{}{}{}", self.prefix, number, self.suffix)
    }

    /// The literal text preceding the placeholder.
    ///
    /// Every id this pattern generates starts with it; rollback uses it to find them.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_string(),
            prefix: "Canvas-".to_string(),
            suffix: String::new(),
            width: 5,
            zero_pad: true,
        }
    }
}

impl FromStr for IdPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for IdPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for IdPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for IdPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        IdPattern::parse(&source).map_err(serde::de::Error::custom)
    }
}
