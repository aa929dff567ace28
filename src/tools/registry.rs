//! Name-keyed tool registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::client::ToolDefinition;

use super::tool::Tool;

/// Registry of tools available to the model.
///
/// Tools can be added and removed at runtime; lookups clone an `Arc`, so a
/// removal never invalidates an in-flight execution.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Mutex<BTreeMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous entry.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "tool_registered");
        self.tools.lock().expect("tool registry poisoned").insert(name, tool);
    }

    /// Remove a tool by name. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self
            .tools
            .lock()
            .expect("tool registry poisoned")
            .remove(name)
            .is_some();
        if removed {
            tracing::debug!(tool = %name, "tool_removed");
        }
        removed
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .lock()
            .expect("tool registry poisoned")
            .get(name)
            .cloned()
    }

    /// Definitions for every registered tool, in name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .lock()
            .expect("tool registry poisoned")
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters().clone(),
            })
            .collect()
    }

    /// Registered tool names, in name order.
    pub fn names(&self) -> Vec<String> {
        self.tools
            .lock()
            .expect("tool registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().expect("tool registry poisoned").is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
