//! Entry ID ranges
//!
//! Every entity kind declares its valid IDs either as a count or as a range.
//! Both normalize to a half-open [`RangeDescriptor`]. An open end spans the
//! whole 32-bit unsigned domain. An empty source range is passed through
//! unnormalized and means "no entries exist in this context".

use crate::config::Value;
use crate::error::{AlxError, Result};
use std::fmt;

/// Upper bound used for open-ended ranges (inclusive)
pub const UNBOUNDED: i64 = 0xFFFF_FFFF;

/// A count-or-range specification as written in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// A single ID, widened by the default size
    Id(i64),
    /// `begin..end` or `begin..=end`, either end may be open
    Range {
        begin: Option<i64>,
        end: Option<i64>,
        inclusive: bool,
    },
}

impl RangeSpec {
    /// Number of IDs in the source range, `None` when unbounded
    fn size(&self) -> Option<i128> {
        match *self {
            RangeSpec::Id(_) => Some(1),
            RangeSpec::Range { end: None, .. } => None,
            RangeSpec::Range {
                begin,
                end: Some(end),
                inclusive,
            } => {
                let end = end as i128;
                let last = if inclusive { end } else { end - 1 };
                Some((last - begin.unwrap_or(0) as i128 + 1).max(0))
            }
        }
    }

    /// Parse a range literal such as `"0..=0x23"`, `"0..0x24"`, `"0x10.."`
    /// or `"..=9"`. A bare integer literal is a single ID.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let Some(split) = text.find("..") else {
            return parse_int(text).map(RangeSpec::Id);
        };

        let (head, tail) = text.split_at(split);
        let tail = &tail[2..];
        let (inclusive, tail) = match tail.strip_prefix('=') {
            Some(rest) => (true, rest),
            None => (false, tail),
        };

        let begin = match head.trim() {
            "" => None,
            s => Some(parse_int(s)?),
        };
        let end = match tail.trim() {
            "" if inclusive => {
                return Err(AlxError::TypeMismatch(format!(
                    "{:?} is an inclusive range without end",
                    text
                )))
            }
            "" => None,
            s => Some(parse_int(s)?),
        };

        Ok(RangeSpec::Range {
            begin,
            end,
            inclusive,
        })
    }
}

impl TryFrom<&Value> for RangeSpec {
    type Error = AlxError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(RangeSpec::Id(*n)),
            Value::String(s) => RangeSpec::parse(s),
            other => Err(AlxError::TypeMismatch(format!(
                "{} is not an integer nor a range",
                other
            ))),
        }
    }
}

fn parse_int(text: &str) -> Result<i64> {
    let text = text.trim();
    let (digits, negative) = match text.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (text, false),
    };

    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i128::from_str_radix(&hex.replace('_', ""), 16).ok()
    } else {
        digits.replace('_', "").parse::<i128>().ok()
    };

    parsed
        .map(|n| if negative { -n } else { n })
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| AlxError::TypeMismatch(format!("{:?} is not an integer nor a range", text)))
}

/// Canonical half-open ID range `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeDescriptor {
    pub min: i64,
    pub max: i64,
}

impl RangeDescriptor {
    pub fn new(min: i64, max: i64) -> Self {
        RangeDescriptor { min, max }
    }

    /// Membership test, always false for an empty descriptor
    pub fn contains(&self, id: i64) -> bool {
        self.min <= id && id < self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }

    /// Number of IDs, zero for an empty descriptor
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.max as i128 - self.min as i128) as usize
        }
    }

    /// IDs in ascending order
    pub fn ids(&self) -> std::ops::Range<i64> {
        if self.is_empty() {
            self.min..self.min
        } else {
            self.min..self.max
        }
    }

    /// Fail with `RecordOutOfRange` unless `id` is a member
    pub fn check(&self, id: i64) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(AlxError::RecordOutOfRange {
                id,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}...{:#x}", self.min, self.max)
    }
}

/// Normalize a count-or-range specification.
///
/// - `Id(n)` becomes `[n, n + default_size)`
/// - a non-empty range becomes `[begin or 0, (end or 0xFFFFFFFF) + 1)`,
///   with an exclusive end first converted to its last member
/// - an empty range keeps its raw bounds
///
/// Fails with `TypeMismatch` when a bound does not fit an `i64`.
pub fn normalize(spec: &RangeSpec, default_size: i64) -> Result<RangeDescriptor> {
    let overflow = || AlxError::TypeMismatch(format!("{:?} overflows the ID domain", spec));

    match *spec {
        RangeSpec::Id(n) => {
            let max = n.checked_add(default_size).ok_or_else(overflow)?;
            Ok(RangeDescriptor::new(n, max))
        }
        RangeSpec::Range {
            begin,
            end,
            inclusive,
        } => {
            if spec.size().map_or(true, |size| size > 0) {
                let min = begin.unwrap_or(0);
                let last = match end {
                    Some(end) if inclusive => end,
                    Some(end) => end.checked_sub(1).ok_or_else(overflow)?,
                    None => UNBOUNDED,
                };
                let max = last.checked_add(1).ok_or_else(overflow)?;
                Ok(RangeDescriptor::new(min, max))
            } else {
                Ok(RangeDescriptor::new(begin.unwrap_or(0), end.unwrap_or(0)))
            }
        }
    }
}

/// Normalize a configuration value, failing with `TypeMismatch` unless it
/// is an integer or a range literal.
pub fn normalize_value(value: &Value, default_size: i64) -> Result<RangeDescriptor> {
    let spec = RangeSpec::try_from(value)?;
    normalize(&spec, default_size)
}
