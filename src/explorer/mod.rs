// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of arbitrary JSON documents into the state tree.
//!
//! The [`Explorer`] walks a document recursively and mirrors it into a
//! [`StateStore`]:
//!
//! ```text
//! {"print": {"bed_temper": 60, "lights_report": [{"node": "chamber_light", "mode": "on"}]}}
//!                                   ↓ traverse(print, "<serial>")
//! <serial>.bed_temper                    = 60
//! <serial>.lights_report                 (channel)
//! <serial>.lights_report.0               (channel)
//! <serial>.lights_report.0.node          = "chamber_light"
//! <serial>.lights_report.0.mode          = "on"
//! ```
//!
//! Leaves are written with change suppression, so traversing an unchanged
//! document again creates nothing and emits no change events.

mod attributes;

pub use attributes::{ArrayPolicy, Attribute, AttributeTable};

use serde_json::{Map, Value};

use crate::error::{ProjectionError, StoreError};
use crate::store::{ObjectDefinition, StateStore};
use crate::types::{StatePath, StateValue};

/// Counters collected during one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraverseStats {
    /// Objects (channels and states) created.
    pub created: usize,
    /// Leaves whose stored value changed.
    pub changed: usize,
    /// Leaves visited.
    pub visited: usize,
    /// Deepest level reached.
    pub max_depth: usize,
}

/// Options that stay fixed for a whole traversal.
#[derive(Debug, Clone, Copy)]
struct Walk {
    create_missing: bool,
    recurse: bool,
}

/// Recursive JSON-to-state-tree projection.
#[derive(Debug, Clone, Default)]
pub struct Explorer {
    attributes: AttributeTable,
}

impl Explorer {
    /// Creates an explorer using `attributes` for naming and array policy.
    #[must_use]
    pub fn new(attributes: AttributeTable) -> Self {
        Self { attributes }
    }

    /// Returns the attribute table.
    #[must_use]
    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// Projects every key of `document` below `root`.
    ///
    /// - `create_missing`: create objects for paths seen for the first time;
    ///   when `false`, unknown leaves are skipped
    /// - `recurse`: descend into nested objects and indexed arrays
    /// - `depth`: level of `root`, used for diagnostics only
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::Write` if the store rejects a write. Nodes
    /// written before the failure stay written.
    pub fn traverse<S: StateStore + ?Sized>(
        &self,
        store: &S,
        document: &Map<String, Value>,
        root: &StatePath,
        create_missing: bool,
        recurse: bool,
        depth: usize,
    ) -> Result<TraverseStats, ProjectionError> {
        let walk = Walk {
            create_missing,
            recurse,
        };
        let mut stats = TraverseStats {
            max_depth: depth,
            ..TraverseStats::default()
        };
        let mut path = root.clone();
        self.visit_object(store, &mut path, document, walk, depth, &mut stats)?;
        Ok(stats)
    }

    fn visit_object<S: StateStore + ?Sized>(
        &self,
        store: &S,
        path: &mut StatePath,
        map: &Map<String, Value>,
        walk: Walk,
        depth: usize,
        stats: &mut TraverseStats,
    ) -> Result<(), ProjectionError> {
        for (key, value) in map {
            path.push(key);
            let result = self.visit(store, path, key, value, walk, depth, stats);
            path.pop();
            result?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn visit<S: StateStore + ?Sized>(
        &self,
        store: &S,
        path: &mut StatePath,
        key: &str,
        value: &Value,
        walk: Walk,
        depth: usize,
        stats: &mut TraverseStats,
    ) -> Result<(), ProjectionError> {
        stats.max_depth = stats.max_depth.max(depth);
        match value {
            Value::Object(map) => {
                if !walk.recurse {
                    return Ok(());
                }
                tracing::trace!(path = %path, depth, "Exploring object");
                self.ensure_channel(store, path, key, walk, stats)?;
                self.visit_object(store, path, map, walk, depth + 1, stats)
            }
            Value::Array(items) => match self.attributes.array_policy(key) {
                ArrayPolicy::Serialized => {
                    self.write_leaf(store, path, key, StateValue::Text(value.to_string()), walk, stats)
                }
                ArrayPolicy::Indexed => {
                    if !walk.recurse {
                        return Ok(());
                    }
                    tracing::trace!(path = %path, depth, len = items.len(), "Exploring array");
                    self.ensure_channel(store, path, key, walk, stats)?;
                    for (index, item) in items.iter().enumerate() {
                        let index = index.to_string();
                        path.push(&index);
                        let result = self.visit(store, path, &index, item, walk, depth + 1, stats);
                        path.pop();
                        result?;
                    }
                    Ok(())
                }
            },
            scalar => match StateValue::from_scalar(scalar) {
                Some(val) => self.write_leaf(store, path, key, val, walk, stats),
                None => Ok(()),
            },
        }
    }

    fn ensure_channel<S: StateStore + ?Sized>(
        &self,
        store: &S,
        path: &StatePath,
        key: &str,
        walk: Walk,
        stats: &mut TraverseStats,
    ) -> Result<(), ProjectionError> {
        if !walk.create_missing || store.get_object(path).is_some() {
            return Ok(());
        }
        let name = self.attributes.get(key).map_or(key, |a| a.name);
        store
            .extend_object(path, ObjectDefinition::channel(name))
            .map_err(|e| write_error(path, e))?;
        stats.created += 1;
        Ok(())
    }

    fn write_leaf<S: StateStore + ?Sized>(
        &self,
        store: &S,
        path: &StatePath,
        key: &str,
        val: StateValue,
        walk: Walk,
        stats: &mut TraverseStats,
    ) -> Result<(), ProjectionError> {
        stats.visited += 1;
        if store.get_object(path).is_none() {
            if !walk.create_missing {
                return Ok(());
            }
            let definition = self.attributes.state_definition(key, &val);
            store
                .extend_object(path, definition)
                .map_err(|e| write_error(path, e))?;
            stats.created += 1;
        }
        if store
            .set_state_changed(path, val, true)
            .map_err(|e| write_error(path, e))?
        {
            stats.changed += 1;
        }
        Ok(())
    }
}

fn write_error(path: &StatePath, source: StoreError) -> ProjectionError {
    ProjectionError::Write {
        path: path.to_string(),
        source,
    }
}
