//! Planning academic year entered as free text ("2025/2026").

use std::fmt;

/// A parsed `YYYY/YYYY` academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcademicYear {
    pub start: i32,
    pub end: i32,
}

impl AcademicYear {
    /// Parse `YYYY/YYYY` where the second year directly follows the first.
    ///
    /// Surrounding whitespace is ignored. Anything else yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let (start, end) = input.trim().split_once('/')?;
        let start = parse_year(start)?;
        let end = parse_year(end)?;
        (end == start + 1).then_some(Self { start, end })
    }

    /// Whether `input` is non-blank but not a valid academic year.
    pub fn is_invalid_input(input: &str) -> bool {
        !input.trim().is_empty() && Self::parse(input).is_none()
    }
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}
