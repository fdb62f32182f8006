//! Session registry
//!
//! The authoritative set of live sessions. Owned exclusively by the hub task,
//! so add, remove and snapshot are serialized by construction.

use crate::session::{SessionHandle, SessionInfo};
use crate::types::SessionId;

/// Live sessions in registration order
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<SessionHandle>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    ///
    /// Returns `false` if a session with the same ID already exists.
    pub fn add(&mut self, handle: SessionHandle) -> bool {
        if self.contains(handle.id) {
            return false;
        }
        self.sessions.push(handle);
        true
    }

    /// Remove a session; a no-op if it is not registered.
    pub fn remove(&mut self, id: SessionId) -> Option<SessionHandle> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(index))
    }

    /// Copy of the current recipients, taken before any send begins.
    pub fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions.clone()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn infos(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(SessionHandle::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(port: u16) -> SessionHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        let addr = format!("127.0.0.1:{port}").parse().unwrap();
        SessionHandle::new(SessionId::new(), addr, tx)
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut registry = SessionRegistry::new();
        let first = handle(1000);

        assert!(registry.add(first.clone()));
        assert!(!registry.add(first.clone()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(first.id));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let a = handle(1000);
        let b = handle(1001);
        registry.add(a.clone());
        registry.add(b.clone());

        assert_eq!(registry.remove(a.id).map(|s| s.id), Some(a.id));
        assert!(registry.remove(a.id).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(b.id));
        assert!(!registry.contains(a.id));
    }

    #[test]
    fn test_snapshot_is_detached_from_later_mutation() {
        let mut registry = SessionRegistry::new();
        let a = handle(1000);
        let b = handle(1001);
        registry.add(a.clone());
        registry.add(b.clone());

        let snapshot = registry.snapshot();
        registry.remove(a.id);
        registry.add(handle(1002));

        let ids: Vec<_> = snapshot.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_infos_preserve_registration_order() {
        let mut registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let a = handle(1000);
        let b = handle(1001);
        registry.add(a.clone());
        registry.add(b.clone());

        let ports: Vec<_> = registry.infos().iter().map(|i| i.peer_addr.port()).collect();
        assert_eq!(ports, vec![1000, 1001]);
    }
}
