//! Call classification kinds.
//!
//! `CallKind` is the closed set of shapes a traced call can take. Each kind
//! carries a stable numeric code; codes at or above `SYNTHETIC_BASE` mark
//! calls that have no declared callee (file inclusion and dynamic evaluation).

/// First code of the synthetic family.
pub const SYNTHETIC_BASE: u8 = 0x10;

/// Classification of one intercepted call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Not classified. Never produced by the classifier itself.
    #[default]
    Unknown,
    /// Free function, or the top-level entry point.
    Normal,
    /// Method called on a bound receiver.
    Member,
    /// Type-qualified call without a receiver.
    Static,
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
    /// Dynamic evaluation of source text.
    Eval,
}

impl CallKind {
    /// Stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown => 0x00,
            Self::Normal => 0x01,
            Self::Member => 0x02,
            Self::Static => 0x03,
            Self::Include => 0x10,
            Self::IncludeOnce => 0x11,
            Self::Require => 0x12,
            Self::RequireOnce => 0x13,
            Self::Eval => 0x14,
        }
    }

    /// Reverse of [`CallKind::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Unknown,
            0x01 => Self::Normal,
            0x02 => Self::Member,
            0x03 => Self::Static,
            0x10 => Self::Include,
            0x11 => Self::IncludeOnce,
            0x12 => Self::Require,
            0x13 => Self::RequireOnce,
            0x14 => Self::Eval,
            _ => return None,
        })
    }

    /// True for calls without a declared callee (inclusion and eval).
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.code() & SYNTHETIC_BASE != 0
    }

    /// True for the four file-inclusion kinds.
    #[must_use]
    pub const fn is_inclusion(self) -> bool {
        matches!(
            self,
            Self::Include | Self::IncludeOnce | Self::Require | Self::RequireOnce
        )
    }

    /// True for kinds that carry an owning type name.
    #[must_use]
    pub const fn has_owner(self) -> bool {
        matches!(self, Self::Member | Self::Static)
    }
}

/// Extended operation code of a synthetic call.
///
/// Values match the interpreter's bit flags for `eval`/`include` variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SyntheticOp {
    Eval = 1 << 0,
    Include = 1 << 1,
    IncludeOnce = 1 << 2,
    Require = 1 << 3,
    RequireOnce = 1 << 4,
}

impl SyntheticOp {
    /// Decode a raw extended value. Anything else is not a synthetic call.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0x01 => Some(Self::Eval),
            0x02 => Some(Self::Include),
            0x04 => Some(Self::IncludeOnce),
            0x08 => Some(Self::Require),
            0x10 => Some(Self::RequireOnce),
            _ => None,
        }
    }

    /// Raw extended value.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Keyword used in composite names (`{include:<file>}`).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Eval => "eval",
            Self::Include => "include",
            Self::IncludeOnce => "include_once",
            Self::Require => "require",
            Self::RequireOnce => "require_once",
        }
    }

    /// Call kind produced for this op.
    #[must_use]
    pub const fn kind(self) -> CallKind {
        match self {
            Self::Eval => CallKind::Eval,
            Self::Include => CallKind::Include,
            Self::IncludeOnce => CallKind::IncludeOnce,
            Self::Require => CallKind::Require,
            Self::RequireOnce => CallKind::RequireOnce,
        }
    }
}
