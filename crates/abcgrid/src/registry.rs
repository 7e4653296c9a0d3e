//! Which editing surface owns an exclusive role.
//!
//! Hosts with several grid editors open (one per tune, per voice) pass
//! one registry to all of them; at most one instance holds each role.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type InstanceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Receives grid clicks for the current bar
    Editing,
    /// Owns an in-progress note drag
    Dragging,
}

#[derive(Debug, Default)]
pub struct EditorRegistry {
    holders: HashMap<Role, InstanceId>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `role` for `instance`, returning the instance it was taken from.
    pub fn acquire(&mut self, role: Role, instance: InstanceId) -> Option<InstanceId> {
        let displaced = self
            .holders
            .insert(role, instance)
            .filter(|previous| *previous != instance);
        if let Some(previous) = displaced {
            tracing::debug!(?role, previous, instance, "role handed over");
        }
        displaced
    }

    /// Drop every role `instance` holds
    pub fn release(&mut self, instance: InstanceId) {
        self.holders.retain(|_, holder| *holder != instance);
    }

    pub fn holder(&self, role: Role) -> Option<InstanceId> {
        self.holders.get(&role).copied()
    }

    pub fn is_active(&self, instance: InstanceId) -> bool {
        self.holders.values().any(|holder| *holder == instance)
    }
}
