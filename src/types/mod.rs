// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the bridge.
//!
//! - [`StatePath`] / [`StateValue`]: ids and scalar values of state nodes
//! - [`SpeedProfile`] / [`PrintStage`]: decoded telemetry enumerations

mod print_stage;
mod speed_profile;
mod state_path;
mod state_value;

pub use print_stage::PrintStage;
pub use speed_profile::SpeedProfile;
pub use state_path::{SEPARATOR, StatePath};
pub use state_value::StateValue;
