// src/plugin/registry.rs

//! Plugin registration, selection and ordering
//!
//! Plugins are registered in a fixed order. Before any operation runs the
//! registry is resolved:
//!
//! 1. allowlist and blocklist from the configuration disable plugins
//! 2. `Conflicts` rules of enabled plugins disable the named plugins
//! 3. `RunBefore` / `RunAfter` rules between enabled plugins are turned
//!    into a graph and sorted topologically; plugins with no constraint
//!    between them keep their registration order
//! 4. `BetterThan` rules assign each plugin a priority one above the
//!    highest priority of the plugins it is better than
//!
//! A cycle in either the ordering or the better-than graph is a
//! configuration error. Rules naming unknown or disabled plugins are
//! ignored.

use super::cache::PluginCache;
use super::context::{PluginContext, SharedContext};
use super::{Capabilities, Plugin, PluginRule};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A registered plugin and its loader-side state
pub struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    index: usize,
    enabled: bool,
    disabled_reason: Option<String>,
    priority: i32,
    cache: Arc<PluginCache>,
    rules: Vec<PluginRule>,
    capabilities: Capabilities,
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// Registration index
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled_reason.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn cache(&self) -> &Arc<PluginCache> {
        &self.cache
    }

    pub fn rules(&self) -> &[PluginRule] {
        &self.rules
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn implements(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Context for one call into this plugin
    pub fn context(&self, shared: &Arc<SharedContext>, cancel: &CancellationToken) -> PluginContext {
        PluginContext::new(
            self.name(),
            self.priority,
            self.cache.clone(),
            shared.clone(),
            cancel.clone(),
        )
    }
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name())
            .field("index", &self.index)
            .field("enabled", &self.enabled)
            .field("priority", &self.priority)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Snapshot of one plugin for display
#[derive(Debug, Clone, Serialize)]
pub struct PluginState {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Position in the resolved order, for enabled plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    pub priority: i32,
    pub capabilities: Vec<&'static str>,
}

/// The set of plugins known to one loader
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    by_name: HashMap<String, usize>,
    /// Entry indices of enabled plugins in run order, once resolved
    order: Option<Vec<usize>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for plugin in crate::plugins::builtin() {
            registry.register(plugin)?;
        }
        Ok(registry)
    }

    /// Add a plugin; names must be unique and non-empty
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name().to_string();
        if name.is_empty() {
            return Err(Error::Configuration("plugin name must not be empty".to_string()));
        }
        if self.by_name.contains_key(&name) {
            return Err(Error::Configuration(format!("plugin {} registered twice", name)));
        }

        let index = self.entries.len();
        let capabilities = plugin.capabilities();
        debug!("registered plugin {} ({:?})", name, capabilities);
        self.entries.push(PluginEntry {
            rules: plugin.rules(),
            plugin,
            index,
            enabled: true,
            disabled_reason: None,
            priority: 0,
            cache: Arc::new(PluginCache::new()),
            capabilities,
        });
        self.by_name.insert(name, index);
        self.order = None;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(PluginEntry::is_enabled)
    }

    /// Disable a plugin, keeping the first reason given
    pub fn disable(&mut self, name: &str, reason: &str) -> bool {
        let Some(&index) = self.by_name.get(name) else {
            return false;
        };
        let entry = &mut self.entries[index];
        if !entry.enabled {
            return false;
        }
        info!("disabling plugin {}: {}", name, reason);
        entry.enabled = false;
        entry.disabled_reason = Some(reason.to_string());
        if let Some(order) = &mut self.order {
            order.retain(|&i| i != index);
        }
        true
    }

    /// Enable or disable a plugin; the order must be resolved again
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("plugin {}", name)))?;
        let entry = &mut self.entries[index];
        entry.enabled = enabled;
        if enabled {
            entry.disabled_reason = None;
        } else if entry.disabled_reason.is_none() {
            entry.disabled_reason = Some("disabled by request".to_string());
        }
        self.order = None;
        Ok(())
    }

    /// Disable plugins missing from a non-empty allowlist or present in the blocklist
    pub fn apply_name_filters(&mut self, allowlist: &[String], blocklist: &[String]) {
        for name in allowlist.iter().chain(blocklist) {
            if !self.by_name.contains_key(name) {
                warn!("plugin filter names unknown plugin {}", name);
            }
        }

        let names: Vec<String> = self.entries.iter().map(|e| e.name().to_string()).collect();
        for name in names {
            if !allowlist.is_empty() && !allowlist.contains(&name) {
                self.disable(&name, "not in allowlist");
            } else if blocklist.contains(&name) {
                self.disable(&name, "in blocklist");
            }
        }
    }

    /// Disable plugins named by `Conflicts` rules of enabled plugins
    ///
    /// Plugins are visited in registration order, so when two plugins
    /// conflict with each other the earlier one wins.
    pub fn apply_conflicts(&mut self) {
        for index in 0..self.entries.len() {
            if !self.entries[index].enabled {
                continue;
            }
            let winner = self.entries[index].name().to_string();
            let targets: Vec<String> = self.entries[index]
                .rules
                .iter()
                .filter_map(|rule| match rule {
                    PluginRule::Conflicts(name) => Some(name.clone()),
                    _ => None,
                })
                .collect();
            for target in targets {
                if target != winner {
                    self.disable(&target, &format!("conflicts with {}", winner));
                }
            }
        }
    }

    /// Compute the run order and priorities of the enabled plugins
    ///
    /// Returns the plugin names in run order.
    pub fn resolve_order(&mut self) -> Result<Vec<String>> {
        let enabled: Vec<usize> = self
            .entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.index)
            .collect();

        let successors = self.ordering_edges();
        let order = topological_order(&enabled, &successors)
            .map_err(|cycle| Error::Configuration(format!("plugin ordering cycle: {}", self.path_names(&cycle))))?;

        let priorities = self.better_than_priorities(&enabled)?;
        for (index, priority) in priorities {
            self.entries[index].priority = priority;
        }

        let names: Vec<String> = order.iter().map(|&i| self.entries[i].name().to_string()).collect();
        debug!("plugin order: {}", names.join(", "));
        self.order = Some(order);
        Ok(names)
    }

    pub fn is_resolved(&self) -> bool {
        self.order.is_some()
    }

    /// Enabled plugins in run order
    ///
    /// Before [`resolve_order`](Self::resolve_order) has run this is the
    /// registration order.
    pub fn ordered(&self) -> Vec<&PluginEntry> {
        match &self.order {
            Some(order) => order.iter().map(|&i| &self.entries[i]).collect(),
            None => self.entries.iter().filter(|e| e.enabled).collect(),
        }
    }

    /// Enabled plugins implementing `capability`, in run order
    pub fn plugins_implementing(&self, capability: Capabilities) -> Vec<&PluginEntry> {
        self.ordered()
            .into_iter()
            .filter(|e| e.implements(capability))
            .collect()
    }

    /// All plugins, enabled ones first in run order, then disabled ones
    pub fn dump_state(&self) -> Vec<PluginState> {
        let ordered = self.ordered();
        let mut states: Vec<PluginState> = ordered
            .iter()
            .enumerate()
            .map(|(position, entry)| self.state_of(entry, Some(position)))
            .collect();
        states.extend(
            self.entries
                .iter()
                .filter(|e| !e.enabled)
                .map(|entry| self.state_of(entry, None)),
        );

        for state in &states {
            match &state.disabled_reason {
                None => debug!("plugin {} enabled, priority {}", state.name, state.priority),
                Some(reason) => debug!("plugin {} disabled: {}", state.name, reason),
            }
        }
        states
    }

    fn state_of(&self, entry: &PluginEntry, order: Option<usize>) -> PluginState {
        PluginState {
            name: entry.name().to_string(),
            enabled: entry.enabled,
            disabled_reason: entry.disabled_reason.clone(),
            order,
            priority: entry.priority,
            capabilities: entry.capabilities.names(),
        }
    }

    /// Index of an enabled plugin named by a rule
    fn enabled_target(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(name)
            .copied()
            .filter(|&i| self.entries[i].enabled)
    }

    /// `a -> b` edges meaning `a` runs before `b`, between enabled plugins
    fn ordering_edges(&self) -> HashMap<usize, BTreeSet<usize>> {
        let mut successors: HashMap<usize, BTreeSet<usize>> = HashMap::new();
        for entry in self.entries.iter().filter(|e| e.enabled) {
            for rule in &entry.rules {
                let edge = match rule {
                    PluginRule::RunBefore(name) => self.enabled_target(name).map(|t| (entry.index, t)),
                    PluginRule::RunAfter(name) => self.enabled_target(name).map(|t| (t, entry.index)),
                    _ => None,
                };
                match edge {
                    Some((from, to)) => {
                        successors.entry(from).or_default().insert(to);
                    }
                    None => {
                        if matches!(rule, PluginRule::RunBefore(_) | PluginRule::RunAfter(_)) {
                            debug!("{}: ignoring rule on unavailable plugin {}", entry.name(), rule.target());
                        }
                    }
                }
            }
        }
        successors
    }

    fn better_than_priorities(&self, enabled: &[usize]) -> Result<HashMap<usize, i32>> {
        let mut better: HashMap<usize, Vec<usize>> = HashMap::new();
        for &index in enabled {
            let targets = self.entries[index]
                .rules
                .iter()
                .filter_map(|rule| match rule {
                    PluginRule::BetterThan(name) => self.enabled_target(name),
                    _ => None,
                })
                .collect();
            better.insert(index, targets);
        }

        let mut priorities = HashMap::new();
        let mut visiting = Vec::new();
        for &index in enabled {
            chain_depth(index, &better, &mut priorities, &mut visiting)
                .map_err(|cycle| Error::Configuration(format!("plugin better-than cycle: {}", self.path_names(&cycle))))?;
        }
        Ok(priorities)
    }

    fn path_names(&self, path: &[usize]) -> String {
        path.iter()
            .map(|&i| self.entries[i].name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Kahn's algorithm with the lowest registration index picked first
///
/// On failure returns one cycle as a closed path of indices.
fn topological_order(
    nodes: &[usize],
    successors: &HashMap<usize, BTreeSet<usize>>,
) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let mut in_degree: HashMap<usize, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    for targets in successors.values() {
        for target in targets {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&n, _)| n)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);
        for target in successors.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*target);
                }
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    let remaining: BTreeSet<usize> = nodes.iter().copied().filter(|n| !order.contains(n)).collect();
    Err(find_cycle(&remaining, successors))
}

/// Walk successors inside `remaining` until a node repeats
fn find_cycle(remaining: &BTreeSet<usize>, successors: &HashMap<usize, BTreeSet<usize>>) -> Vec<usize> {
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = successors
            .get(&current)
            .and_then(|targets| targets.iter().find(|t| remaining.contains(t)).copied());
        let Some(next) = next else {
            return path;
        };
        if let Some(position) = path.iter().position(|&n| n == next) {
            let mut cycle = path.split_off(position);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}

/// Length of the longest better-than chain starting at `node`
fn chain_depth(
    node: usize,
    better: &HashMap<usize, Vec<usize>>,
    depths: &mut HashMap<usize, i32>,
    visiting: &mut Vec<usize>,
) -> std::result::Result<i32, Vec<usize>> {
    if let Some(&depth) = depths.get(&node) {
        return Ok(depth);
    }
    if let Some(position) = visiting.iter().position(|&n| n == node) {
        let mut cycle = visiting[position..].to_vec();
        cycle.push(node);
        return Err(cycle);
    }

    visiting.push(node);
    let mut depth = 0;
    for &worse in better.get(&node).into_iter().flatten() {
        depth = depth.max(chain_depth(worse, better, depths, visiting)? + 1);
    }
    visiting.pop();
    depths.insert(node, depth);
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        rules: Vec<PluginRule>,
    }

    #[async_trait]
    impl Plugin for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::REFINE
        }

        fn rules(&self) -> Vec<PluginRule> {
            self.rules.clone()
        }
    }

    fn stub(name: &'static str, rules: Vec<PluginRule>) -> Arc<dyn Plugin> {
        Arc::new(Stub { name, rules })
    }

    fn registry(plugins: Vec<Arc<dyn Plugin>>) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.register(plugin).unwrap();
        }
        registry
    }

    #[test]
    fn test_registration_order_without_rules() {
        let mut reg = registry(vec![stub("c", vec![]), stub("a", vec![]), stub("b", vec![])]);
        assert_eq!(reg.resolve_order().unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_run_after_and_run_before() {
        let mut reg = registry(vec![
            stub("icons", vec![PluginRule::run_after("appstream")]),
            stub("appstream", vec![]),
            stub("updates", vec![PluginRule::run_after("appstream"), PluginRule::run_before("icons")]),
        ]);
        assert_eq!(reg.resolve_order().unwrap(), vec!["appstream", "updates", "icons"]);
    }

    #[test]
    fn test_rules_on_missing_plugins_are_ignored() {
        let mut reg = registry(vec![stub("a", vec![PluginRule::run_after("packagekit")]), stub("b", vec![])]);
        assert_eq!(reg.resolve_order().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rules_on_disabled_plugins_are_ignored() {
        let mut reg = registry(vec![
            stub("a", vec![PluginRule::run_after("b")]),
            stub("b", vec![PluginRule::run_after("a")]),
        ]);
        reg.disable("b", "test");
        assert_eq!(reg.resolve_order().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_cycle_is_configuration_error() {
        let mut reg = registry(vec![
            stub("a", vec![PluginRule::run_after("c")]),
            stub("b", vec![PluginRule::run_after("a")]),
            stub("c", vec![PluginRule::run_after("b")]),
        ]);
        let err = reg.resolve_order().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("cycle"));
        assert!(!reg.is_resolved());
    }

    #[test]
    fn test_self_rule_is_cycle() {
        let mut reg = registry(vec![stub("a", vec![PluginRule::run_after("a")])]);
        assert!(matches!(reg.resolve_order(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = registry(vec![stub("a", vec![])]);
        assert!(matches!(reg.register(stub("a", vec![])), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_conflicts_disable_target() {
        let mut reg = registry(vec![
            stub("dpkg", vec![PluginRule::conflicts("rpm")]),
            stub("rpm", vec![PluginRule::conflicts("dpkg")]),
        ]);
        reg.apply_conflicts();
        assert!(reg.is_enabled("dpkg"));
        assert!(!reg.is_enabled("rpm"));
        assert_eq!(reg.get("rpm").unwrap().disabled_reason(), Some("conflicts with dpkg"));
    }

    #[test]
    fn test_better_than_priorities() {
        let mut reg = registry(vec![
            stub("flatpak", vec![PluginRule::better_than("packagekit")]),
            stub("packagekit", vec![PluginRule::better_than("appstream")]),
            stub("appstream", vec![]),
        ]);
        reg.resolve_order().unwrap();
        assert_eq!(reg.get("flatpak").unwrap().priority(), 2);
        assert_eq!(reg.get("packagekit").unwrap().priority(), 1);
        assert_eq!(reg.get("appstream").unwrap().priority(), 0);
    }

    #[test]
    fn test_better_than_cycle() {
        let mut reg = registry(vec![
            stub("a", vec![PluginRule::better_than("b")]),
            stub("b", vec![PluginRule::better_than("a")]),
        ]);
        let err = reg.resolve_order().unwrap_err();
        assert!(err.to_string().contains("better-than"));
    }

    #[test]
    fn test_name_filters() {
        let mut reg = registry(vec![stub("a", vec![]), stub("b", vec![]), stub("c", vec![])]);
        reg.apply_name_filters(&["a".to_string(), "b".to_string()], &["b".to_string()]);
        assert_eq!(reg.resolve_order().unwrap(), vec!["a"]);

        let states = reg.dump_state();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].order, Some(0));
        assert_eq!(states[1].disabled_reason.as_deref(), Some("in blocklist"));
        assert_eq!(states[2].disabled_reason.as_deref(), Some("not in allowlist"));
    }

    #[test]
    fn test_disable_after_resolve_keeps_order() {
        let mut reg = registry(vec![stub("a", vec![]), stub("b", vec![]), stub("c", vec![])]);
        reg.resolve_order().unwrap();
        reg.disable("b", "setup failed");
        let names: Vec<&str> = reg.ordered().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(reg.plugins_implementing(Capabilities::REFINE).len(), 2);
        assert!(reg.plugins_implementing(Capabilities::SEARCH).is_empty());
    }
}
