// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Print speed profiles reported in `spd_lvl`.

use std::fmt;

/// The printer's speed profile.
///
/// The firmware reports the active profile as a small integer in the
/// `spd_lvl` telemetry field.
///
/// # Examples
///
/// ```
/// use bambu_bridge::types::SpeedProfile;
///
/// assert_eq!(SpeedProfile::from_level(2), Some(SpeedProfile::Standard));
/// assert_eq!(SpeedProfile::from_level(9), None);
/// assert_eq!(SpeedProfile::Ludicrous.to_string(), "ludicrous");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedProfile {
    /// Level 1, reduced speed and noise.
    Silent,
    /// Level 2, the default.
    Standard,
    /// Level 3.
    Sport,
    /// Level 4, maximum speed.
    Ludicrous,
}

impl SpeedProfile {
    /// Maps a firmware level to a profile.
    #[must_use]
    pub const fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::Silent),
            2 => Some(Self::Standard),
            3 => Some(Self::Sport),
            4 => Some(Self::Ludicrous),
            _ => None,
        }
    }

    /// Returns the profile name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Standard => "standard",
            Self::Sport => "sport",
            Self::Ludicrous => "ludicrous",
        }
    }
}

impl fmt::Display for SpeedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
