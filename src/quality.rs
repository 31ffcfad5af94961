//! The quality tiers understood by the playback API.

use std::fmt::{self, Display};

/// A target resolution, as the `qn` code sent to the playback API.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Quality {
    /// 1080P, the default.
    #[default]
    P1080 = 80,
    /// 720P
    P720 = 64,
    /// 480P
    P480 = 32,
    /// 360P
    P360 = 16,
}

impl Quality {
    /// All tiers, highest resolution first.
    pub const ALL: [Quality; 4] = [Quality::P1080, Quality::P720, Quality::P480, Quality::P360];

    /// Converts a `qn` code into a tier.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.code() == code)
    }

    /// Converts an optional code, falling back to the highest tier when it
    /// is missing or unknown.
    pub fn from_code_or_default(code: Option<u32>) -> Self {
        code.and_then(Self::from_code).unwrap_or_default()
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// The human readable label, also used in output file names.
    pub fn label(self) -> &'static str {
        match self {
            Quality::P1080 => "1080P",
            Quality::P720 => "720P",
            Quality::P480 => "480P",
            Quality::P360 => "360P",
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
