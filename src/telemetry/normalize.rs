// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion of raw telemetry fields into presentation units.
//!
//! Every function here is total: absent or unparseable input yields `None`
//! (the field is then left as it is), out-of-range input is clamped or
//! passed through as an "unknown" label. Nothing panics.
//!
//! The firmware reports several integers as JSON strings (`"15"`), so all
//! functions accept numbers and numeric strings alike.

use serde_json::{Map, Value, json};

use crate::types::{PrintStage, SpeedProfile};

/// Highest fan notch reported by the firmware.
const FAN_MAX_NOTCH: i64 = 15;

/// Telemetry keys holding fan notch values.
pub const FAN_KEYS: &[&str] = &[
    "cooling_fan_speed",
    "heatbreak_fan_speed",
    "big_fan1_speed",
    "big_fan2_speed",
];

/// Telemetry key of the current stage code.
pub const STAGE_KEY: &str = "stg_cur";

/// Telemetry key of the speed level.
pub const SPEED_KEY: &str = "spd_lvl";

/// Telemetry key of the remaining print time in minutes.
pub const REMAINING_TIME_KEY: &str = "mc_remaining_time";

/// Reads an integer from a JSON number or numeric string.
// Float-to-int casts saturate, which is what we want for telemetry values.
#[allow(clippy::cast_possible_truncation)]
fn as_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts a fan notch (0-15) into a percentage.
///
/// # Examples
///
/// ```
/// use bambu_bridge::telemetry::normalize::fan_speed;
/// use serde_json::json;
///
/// assert_eq!(fan_speed(Some(&json!(0))), Some(0));
/// assert_eq!(fan_speed(Some(&json!("15"))), Some(100));
/// assert_eq!(fan_speed(Some(&json!(9))), Some(60));
/// assert_eq!(fan_speed(None), None);
/// ```
#[must_use]
pub fn fan_speed(raw: Option<&Value>) -> Option<u8> {
    let notch = as_integer(raw)?.clamp(0, FAN_MAX_NOTCH);
    let percent = (notch * 100 + FAN_MAX_NOTCH / 2) / FAN_MAX_NOTCH;
    u8::try_from(percent).ok()
}

/// Converts a stage code into a label.
///
/// Unknown codes become `"unknown(<code>)"`.
#[must_use]
pub fn stage_label(code: Option<&Value>) -> Option<String> {
    as_integer(code).map(|code| PrintStage::from_code(code).to_string())
}

/// Converts a speed level into a profile name.
///
/// Unknown levels become `"unknown(<level>)"`.
#[must_use]
pub fn speed_profile(level: Option<&Value>) -> Option<String> {
    as_integer(level).map(|level| {
        SpeedProfile::from_level(level)
            .map_or_else(|| format!("unknown({level})"), |p| p.as_str().to_string())
    })
}

/// Passes remaining minutes through, clamping negative values to zero.
#[must_use]
pub fn remaining_time(minutes: Option<&Value>) -> Option<i64> {
    as_integer(minutes).map(|m| m.max(0))
}

/// Formats minutes as `"<h>h <mm>m"`.
///
/// # Examples
///
/// ```
/// use bambu_bridge::telemetry::normalize::format_remaining;
///
/// assert_eq!(format_remaining(65), "1h 05m");
/// assert_eq!(format_remaining(-3), "0h 00m");
/// ```
#[must_use]
pub fn format_remaining(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Replaces the raw values in a `print` section with normalized ones.
///
/// Fields that are absent or cannot be read are left untouched.
pub fn apply(print: &mut Map<String, Value>) {
    for key in FAN_KEYS {
        if let Some(percent) = fan_speed(print.get(*key)) {
            print.insert((*key).to_string(), json!(percent));
        }
    }
    if let Some(label) = stage_label(print.get(STAGE_KEY)) {
        print.insert(STAGE_KEY.to_string(), json!(label));
    }
    if let Some(profile) = speed_profile(print.get(SPEED_KEY)) {
        print.insert(SPEED_KEY.to_string(), json!(profile));
    }
    if let Some(minutes) = remaining_time(print.get(REMAINING_TIME_KEY)) {
        print.insert(REMAINING_TIME_KEY.to_string(), json!(minutes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_speed_bounds() {
        assert_eq!(fan_speed(Some(&json!(0))), Some(0));
        assert_eq!(fan_speed(Some(&json!(15))), Some(100));
    }

    #[test]
    fn fan_speed_scales_per_notch() {
        assert_eq!(fan_speed(Some(&json!(1))), Some(7));
        assert_eq!(fan_speed(Some(&json!(3))), Some(20));
        assert_eq!(fan_speed(Some(&json!("10"))), Some(67));
    }

    #[test]
    fn fan_speed_clamps_out_of_range() {
        assert_eq!(fan_speed(Some(&json!(-4))), Some(0));
        assert_eq!(fan_speed(Some(&json!(99))), Some(100));
        assert_eq!(fan_speed(Some(&json!(i64::MAX))), Some(100));
    }

    #[test]
    fn fan_speed_absent_or_garbage() {
        assert_eq!(fan_speed(None), None);
        assert_eq!(fan_speed(Some(&json!(null))), None);
        assert_eq!(fan_speed(Some(&json!("fast"))), None);
        assert_eq!(fan_speed(Some(&json!([1]))), None);
    }

    #[test]
    fn stage_label_known_and_unknown() {
        assert_eq!(stage_label(Some(&json!(2))).as_deref(), Some("heatbed preheating"));
        assert_eq!(stage_label(Some(&json!(-1))).as_deref(), Some("idle"));
        assert_eq!(stage_label(Some(&json!(-20))).as_deref(), Some("unknown(-20)"));
        assert_eq!(stage_label(None), None);
    }

    #[test]
    fn stage_label_never_panics() {
        for code in [i64::MIN, -1000, -2, 36, 254, 256, i64::MAX] {
            assert!(stage_label(Some(&json!(code))).is_some());
        }
    }

    #[test]
    fn speed_profile_known_and_unknown() {
        assert_eq!(speed_profile(Some(&json!(1))).as_deref(), Some("silent"));
        assert_eq!(speed_profile(Some(&json!("4"))).as_deref(), Some("ludicrous"));
        assert_eq!(speed_profile(Some(&json!(0))).as_deref(), Some("unknown(0)"));
        assert_eq!(speed_profile(Some(&json!(-3))).as_deref(), Some("unknown(-3)"));
        assert_eq!(speed_profile(None), None);
    }

    #[test]
    fn remaining_time_clamps_negative() {
        assert_eq!(remaining_time(Some(&json!(42))), Some(42));
        assert_eq!(remaining_time(Some(&json!(-5))), Some(0));
        assert_eq!(remaining_time(None), None);
    }

    #[test]
    fn fractional_numbers_round() {
        assert_eq!(remaining_time(Some(&json!(12.6))), Some(13));
    }

    #[test]
    fn apply_rewrites_known_fields_only() {
        let mut print = json!({
            "cooling_fan_speed": "15",
            "heatbreak_fan_speed": "0",
            "stg_cur": 13,
            "spd_lvl": 2,
            "mc_remaining_time": -1,
            "nozzle_temper": 220.5
        });
        let map = print.as_object_mut().unwrap();
        apply(map);

        assert_eq!(map["cooling_fan_speed"], json!(100));
        assert_eq!(map["heatbreak_fan_speed"], json!(0));
        assert_eq!(map["stg_cur"], json!("homing toolhead"));
        assert_eq!(map["spd_lvl"], json!("standard"));
        assert_eq!(map["mc_remaining_time"], json!(0));
        assert_eq!(map["nozzle_temper"], json!(220.5));
        assert!(!map.contains_key("big_fan1_speed"));
    }

    #[test]
    fn apply_leaves_unreadable_fields() {
        let mut print = json!({"big_fan2_speed": "n/a"});
        let map = print.as_object_mut().unwrap();
        apply(map);
        assert_eq!(map["big_fan2_speed"], json!("n/a"));
    }
}
