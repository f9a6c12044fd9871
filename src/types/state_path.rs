// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchical state identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Separator between path segments in a state id.
pub const SEPARATOR: char = '.';

/// Characters that may not appear inside a single path segment.
const FORBIDDEN: &[char] = &['.', '*', '?', '[', ']', '"', '\'', ',', ' ', '\t', '\n', '\r'];

/// A hierarchical state id such as `01S00A000000000.control.chamberLight`.
///
/// Paths are built segment by segment, which keeps JSON keys containing a
/// separator from silently creating extra levels: such characters are
/// replaced with `_` when a segment is pushed.
///
/// # Examples
///
/// ```
/// use bambu_bridge::types::StatePath;
///
/// let path = StatePath::root("01S00A000000000").child("ams").child("tray.0");
/// assert_eq!(path.to_string(), "01S00A000000000.ams.tray_0");
/// assert_eq!(path.last(), Some("tray_0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatePath {
    segments: Vec<String>,
}

impl StatePath {
    /// Creates a path with a single (sanitized) segment.
    #[must_use]
    pub fn root(segment: &str) -> Self {
        let mut path = Self {
            segments: Vec::with_capacity(4),
        };
        path.push(segment);
        path
    }

    /// Appends a segment in place.
    pub fn push(&mut self, segment: &str) {
        self.segments.push(sanitize(segment));
    }

    /// Removes the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Returns the last segment.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

fn sanitize(segment: &str) -> String {
    if segment.is_empty() {
        return "_".to_string();
    }
    segment
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for StatePath {
    type Err = StoreError;

    /// Parses a dotted id. Segments are taken verbatim; empty segments are
    /// rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(StoreError::InvalidId(s.to_string()));
        }
        Ok(Self { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_segments() {
        let path = StatePath::root("serial").child("print").child("bed_temper");
        assert_eq!(path.to_string(), "serial.print.bed_temper");
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        let path = StatePath::root("s").child("a.b").child("x y*");
        assert_eq!(path.to_string(), "s.a_b.x_y_");
        assert_eq!(path.last(), Some("x_y_"));
    }

    #[test]
    fn empty_segment_becomes_underscore() {
        assert_eq!(StatePath::root("s").child("").to_string(), "s._");
    }

    #[test]
    fn push_and_pop_restore_path() {
        let mut path = StatePath::root("s");
        path.push("ams");
        assert_eq!(path.pop().as_deref(), Some("ams"));
        assert_eq!(path, StatePath::root("s"));
    }

    #[test]
    fn parse_round_trips_display() {
        let path: StatePath = "s.control.start".parse().unwrap();
        assert_eq!(path.last(), Some("start"));
        assert_eq!(path.to_string(), "s.control.start");
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!("".parse::<StatePath>().is_err());
        assert!("a..b".parse::<StatePath>().is_err());
        assert!("a.".parse::<StatePath>().is_err());
    }
}
