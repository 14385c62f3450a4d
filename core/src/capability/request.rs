//! Outstanding capability request set.

use super::{resolver, ApiLevel, CapabilityAlias, CapabilityCategory, PermissionState};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Aliases to request from the permission subsystem, in first-seen order.
///
/// Starts from the default set for the API level; explicitly requested
/// categories only ever append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRequest {
    level: ApiLevel,
    aliases: Vec<CapabilityAlias>,
}

impl CapabilityRequest {
    pub fn new(level: ApiLevel) -> Self {
        Self {
            level,
            aliases: resolver::default_aliases(level).to_vec(),
        }
    }

    pub fn level(&self) -> ApiLevel {
        self.level
    }

    pub fn aliases(&self) -> &[CapabilityAlias] {
        &self.aliases
    }

    pub fn contains(&self, alias: CapabilityAlias) -> bool {
        self.aliases.contains(&alias)
    }

    /// Append the aliases for `category`; returns how many were new.
    pub fn add_category(&mut self, category: CapabilityCategory) -> usize {
        let mut added = 0;
        for alias in resolver::aliases_for(self.level, category) {
            if !self.aliases.contains(alias) {
                self.aliases.push(*alias);
                added += 1;
            }
        }
        added
    }

    /// Append every category named in a host `permissions` list. Unknown names
    /// are skipped.
    pub fn add_named<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> usize {
        names
            .into_iter()
            .filter_map(|name| match CapabilityCategory::from_wire(name) {
                Some(category) => Some(category),
                None => {
                    tracing::debug!("Ignoring unknown permission category {:?}", name);
                    None
                }
            })
            .map(|category| self.add_category(category))
            .sum()
    }

    /// Keep only the states for aliases in this request.
    /// Aliases the subsystem did not report are left out.
    pub fn filter_states(
        &self,
        states: &HashMap<String, PermissionState>,
    ) -> Vec<(CapabilityAlias, PermissionState)> {
        self.aliases
            .iter()
            .filter_map(|alias| states.get(alias.as_str()).map(|state| (*alias, *state)))
            .collect()
    }

    /// Filtered states as the host-facing result object, keyed by alias name.
    pub fn status_object(&self, states: &HashMap<String, PermissionState>) -> Value {
        let mut object = Map::new();
        for (alias, state) in self.filter_states(states) {
            object.insert(alias.as_str().into(), Value::String(state.as_str().into()));
        }
        Value::Object(object)
    }

    /// Aliases in this request that are not granted.
    pub fn missing(&self, states: &HashMap<String, PermissionState>) -> Vec<CapabilityAlias> {
        self.aliases
            .iter()
            .filter(|alias| states.get(alias.as_str()) != Some(&PermissionState::Granted))
            .copied()
            .collect()
    }
}
