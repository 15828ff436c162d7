//! Geometry change-listener registry
//!
//! A change listener marks a geometry whose live edits drive the current
//! measurement readout. Listeners are attached for the duration of a draw
//! (draw-start to draw-end) or of a modify (modify-start to modify-end) and
//! for nothing else, so the number of registered listeners never exceeds the
//! number of geometries being interactively edited.
//!
//! `register` and `unregister` are the only mutation points. Both are
//! idempotent: unregistering an absent listener is a no-op.

use crate::geometry::GeometryId;
use std::collections::HashMap;

/// Unique identifier for a registered listener
pub type ListenerId = u64;

/// Which interaction attached a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerScope {
    /// Attached on draw-start, detached on draw-end
    Draw,
    /// Attached on modify-start, detached on modify-end
    Modify,
}

/// Handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle {
    pub id: ListenerId,
    pub scope: ListenerScope,
}

/// Registry mapping geometry IDs to their change listener
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    handles: HashMap<GeometryId, ListenerHandle>,
    next_id: ListenerId,
}

impl ListenerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener to a geometry
    ///
    /// A geometry holds at most one listener; registering again replaces the
    /// previous handle.
    pub fn register(&mut self, geometry_id: GeometryId, scope: ListenerScope) -> ListenerId {
        self.next_id += 1;
        let handle = ListenerHandle {
            id: self.next_id,
            scope,
        };
        if let Some(previous) = self.handles.insert(geometry_id, handle) {
            log::debug!(
                "replaced {:?} listener {} on {}",
                previous.scope,
                previous.id,
                geometry_id
            );
        }
        log::debug!("registered {:?} listener {} on {}", scope, handle.id, geometry_id);
        handle.id
    }

    /// Detach the listener of a geometry, if any
    pub fn unregister(&mut self, geometry_id: GeometryId) -> Option<ListenerHandle> {
        let removed = self.handles.remove(&geometry_id);
        if let Some(handle) = removed {
            log::debug!(
                "unregistered {:?} listener {} on {}",
                handle.scope,
                handle.id,
                geometry_id
            );
        }
        removed
    }

    /// Detach the listener of a geometry only if it has the given scope
    pub fn unregister_scoped(
        &mut self,
        geometry_id: GeometryId,
        scope: ListenerScope,
    ) -> Option<ListenerHandle> {
        match self.handles.get(&geometry_id) {
            Some(handle) if handle.scope == scope => self.unregister(geometry_id),
            _ => None,
        }
    }

    /// Detach every listener of a scope. Returns the affected geometries.
    pub fn unregister_scope(&mut self, scope: ListenerScope) -> Vec<GeometryId> {
        let ids: Vec<GeometryId> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.scope == scope)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.unregister(*id);
        }
        ids
    }

    /// Check whether a geometry has a listener
    pub fn is_listening(&self, geometry_id: GeometryId) -> bool {
        self.handles.contains_key(&geometry_id)
    }

    pub fn get(&self, geometry_id: GeometryId) -> Option<ListenerHandle> {
        self.handles.get(&geometry_id).copied()
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Detach everything
    pub fn clear(&mut self) {
        if !self.handles.is_empty() {
            log::debug!("clearing {} listeners", self.handles.len());
        }
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        let mut registry = ListenerRegistry::new();
        let id = GeometryId::now_v7();

        registry.register(id, ListenerScope::Draw);
        assert!(registry.is_listening(id));
        assert_eq!(registry.len(), 1);

        let handle = registry.unregister(id).unwrap();
        assert_eq!(handle.scope, ListenerScope::Draw);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ListenerRegistry::new();
        let id = GeometryId::now_v7();
        assert!(registry.unregister(id).is_none());
        registry.register(id, ListenerScope::Modify);
        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn test_single_listener_per_geometry() {
        let mut registry = ListenerRegistry::new();
        let id = GeometryId::now_v7();
        let first = registry.register(id, ListenerScope::Draw);
        let second = registry.register(id, ListenerScope::Modify);
        assert_ne!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().scope, ListenerScope::Modify);
    }

    #[test]
    fn test_scoped_unregister() {
        let mut registry = ListenerRegistry::new();
        let drawing = GeometryId::now_v7();
        let editing = GeometryId::now_v7();
        registry.register(drawing, ListenerScope::Draw);
        registry.register(editing, ListenerScope::Modify);

        assert!(registry
            .unregister_scoped(drawing, ListenerScope::Modify)
            .is_none());
        assert!(registry.is_listening(drawing));

        assert_eq!(registry.unregister_scope(ListenerScope::Modify), vec![editing]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_modify_cycles_leave_no_listener() {
        let mut registry = ListenerRegistry::new();
        let id = GeometryId::now_v7();
        for _ in 0..25 {
            registry.register(id, ListenerScope::Modify);
            registry.unregister_scoped(id, ListenerScope::Modify);
        }
        assert!(!registry.is_listening(id));
        assert!(registry.is_empty());
    }
}
