//! Trice identifiers, ID ranges and format descriptors

use crate::config::{
    ConfigError, DEFAULT_ID_MAX, DEFAULT_ID_MAX_SHORT, DEFAULT_ID_MIN, DEFAULT_ID_MIN_SHORT,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier embedded in a trice macro invocation.
///
/// `0` means "unassigned" and is never the key of a real list entry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TriceId(pub u32);

impl TriceId {
    /// Sentinel written into sources that still need an ID
    pub const UNASSIGNED: TriceId = TriceId(0);

    pub fn is_unassigned(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for TriceId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TriceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Inclusive range `[min, max]` new IDs are drawn from.
///
/// Only [`IdRange::new`] builds one, so `min <= max` and `0` is never inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    min: TriceId,
    max: TriceId,
}

impl IdRange {
    /// Default range for normal trices
    pub const NORMAL: IdRange = IdRange {
        min: TriceId(DEFAULT_ID_MIN),
        max: TriceId(DEFAULT_ID_MAX),
    };

    /// Default range for short trices
    pub const SHORT: IdRange = IdRange {
        min: TriceId(DEFAULT_ID_MIN_SHORT),
        max: TriceId(DEFAULT_ID_MAX_SHORT),
    };

    /// Create a range, rejecting inverted bounds and ranges that contain the
    /// unassigned sentinel.
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvertedRange { min, max });
        }
        if min == 0 {
            return Err(ConfigError::ZeroInRange { min, max });
        }
        Ok(Self {
            min: TriceId(min),
            max: TriceId(max),
        })
    }

    pub fn min(&self) -> TriceId {
        self.min
    }

    pub fn max(&self) -> TriceId {
        self.max
    }

    pub fn contains(&self, id: TriceId) -> bool {
        self.min <= id && id <= self.max
    }

    /// Number of IDs in the range
    pub fn len(&self) -> u64 {
        u64::from(self.max.0 - self.min.0) + 1
    }

    /// Ranges always hold at least one ID
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn overlaps(&self, other: &IdRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// All IDs from `min` up to `max`
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = TriceId> + use<> {
        (self.min.0..=self.max.0).map(TriceId)
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// One logged message shape: the exact macro name and the literal format string.
///
/// `strg` keeps escape sequences as written in the source (`\n` stays two
/// characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriceFmt {
    #[serde(rename = "Type")]
    pub ty: String,
    #[serde(rename = "Strg")]
    pub strg: String,
}

impl TriceFmt {
    pub fn new(ty: impl Into<String>, strg: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            strg: strg.into(),
        }
    }

    /// Whether `ty` names a short trice (`Trice...`)
    pub fn is_short(&self) -> bool {
        self.ty.starts_with("Trice")
    }

    /// Key used for shared-ID lookups: `Type` uppercased, `Strg` untouched.
    /// Never stored.
    pub fn normalized(&self) -> TriceFmt {
        TriceFmt {
            ty: self.ty.to_ascii_uppercase(),
            strg: self.strg.clone(),
        }
    }
}

impl fmt::Display for TriceFmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.ty, self.strg)
    }
}

/// Payload widths a trice macro family can carry
const WIDTHS: &[&str] = &["0", "8", "16", "32", "64"];

/// Spelling of the `Id(n)` wrapper around an embedded ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperSpelling {
    /// `Id(n)`, used by normal trices
    Upper,
    /// `id(n)`, used by short trices
    Lower,
}

impl WrapperSpelling {
    pub fn as_str(self) -> &'static str {
        match self {
            WrapperSpelling::Upper => "Id",
            WrapperSpelling::Lower => "id",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Id" => Some(WrapperSpelling::Upper),
            "id" => Some(WrapperSpelling::Lower),
            _ => None,
        }
    }
}

/// A macro name such as `TRICE16_2i`, split into its parts.
///
/// The `trice` family token is case-insensitive, the width is one of
/// `0 8 16 32 64`, followed by an optional `_<n>` parameter count and an
/// optional interrupt marker `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroName {
    /// The name exactly as written
    pub text: String,
    /// Byte length of `trice<width>` at the start of `text`
    family_len: usize,
    pub param_count: Option<usize>,
    pub interrupt: bool,
}

impl MacroName {
    pub fn parse(name: &str) -> Option<Self> {
        let family = name.get(..5)?;
        if !family.eq_ignore_ascii_case("trice") {
            return None;
        }
        let rest = &name[5..];
        let width_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if !WIDTHS.contains(&&rest[..width_len]) {
            return None;
        }
        let mut rest = &rest[width_len..];

        let param_count = match rest.strip_prefix('_') {
            Some(after) => {
                let digits = after.bytes().take_while(u8::is_ascii_digit).count();
                if digits == 0 {
                    return None;
                }
                let count = after[..digits].parse().ok()?;
                rest = &after[digits..];
                Some(count)
            }
            None => None,
        };

        let interrupt = match rest {
            "" => false,
            "i" => true,
            _ => return None,
        };

        Some(Self {
            text: name.to_string(),
            family_len: 5 + width_len,
            param_count,
            interrupt,
        })
    }

    /// Payload width in bits (`0` for parameterless trices)
    pub fn width(&self) -> &str {
        &self.text[5..self.family_len]
    }

    /// Short trices are spelled `Trice...` and draw IDs from the short range
    pub fn is_short(&self) -> bool {
        self.text.starts_with("Trice")
    }

    /// Whether the name can be extended with an explicit `_<n>` count
    pub fn lacks_param_count(&self) -> bool {
        self.param_count.is_none() && self.width() != "0"
    }

    /// The name with `_<count>` inserted before the interrupt marker,
    /// e.g. `Trice8i` -> `Trice8_1i`
    pub fn with_param_count(&self, count: usize) -> String {
        format!(
            "{}_{}{}",
            &self.text[..self.family_len],
            count,
            if self.interrupt { "i" } else { "" }
        )
    }

    /// Wrapper spelling matching the name's case convention
    pub fn wrapper(&self) -> WrapperSpelling {
        if self.is_short() {
            WrapperSpelling::Lower
        } else {
            WrapperSpelling::Upper
        }
    }

    /// Render the ID wrapper inserted into sources: `id(n)` for short trices,
    /// `Id(%6d)` for normal ones.
    pub fn render_id(&self, id: TriceId) -> String {
        match self.wrapper() {
            WrapperSpelling::Lower => format!("id({})", id),
            WrapperSpelling::Upper => format!("Id({:6})", id.0),
        }
    }
}

impl fmt::Display for MacroName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
