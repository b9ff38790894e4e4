//! In-memory registry of client sessions keyed by connection identifier.
//!
//! Every mutation happens inside a single critical section and the lock is
//! never held across an `.await`, so a session cannot be observed half
//! updated by a concurrent handler.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::realtime::SharedStream;

/// State kept for one connected client
#[derive(Clone, Default)]
pub struct Session {
    stream: Option<SharedStream>,
}

impl Session {
    /// The active stream handle, if a conversation is running
    pub fn stream(&self) -> Option<&SharedStream> {
        self.stream.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("stream", &self.stream.as_ref().map(|s| s.id().to_string()))
            .finish()
    }
}

/// Result of [`SessionRegistry::attach_stream`]
///
/// Handles that did not end up in the registry are handed back so the
/// caller can close them.
#[must_use]
pub enum AttachOutcome {
    /// The handle is now the session's active stream
    Attached,
    /// The handle was attached and this previous handle was displaced
    Replaced(SharedStream),
    /// No such session; the handle was not stored
    SessionMissing(SharedStream),
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blank session, overwriting any existing entry.
    ///
    /// Returns the stream of the overwritten entry, if it had one.
    pub fn create(&self, id: &str) -> Option<SharedStream> {
        let previous = self
            .sessions
            .write()
            .insert(id.to_string(), Session::default());
        debug!("Session {} created", id);
        previous.and_then(|session| session.stream)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    /// The session's active stream handle, if any
    pub fn active_stream(&self, id: &str) -> Option<SharedStream> {
        self.sessions
            .read()
            .get(id)
            .and_then(|session| session.stream.clone())
    }

    pub fn attach_stream(&self, id: &str, handle: SharedStream) -> AttachOutcome {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(id) {
            Some(session) => match session.stream.replace(handle) {
                Some(previous) => AttachOutcome::Replaced(previous),
                None => AttachOutcome::Attached,
            },
            None => {
                warn!("Cannot attach stream {}: session {} not found", handle.id(), id);
                AttachOutcome::SessionMissing(handle)
            }
        }
    }

    /// Clear and return the session's stream handle
    pub fn detach_stream(&self, id: &str) -> Option<SharedStream> {
        self.sessions
            .write()
            .get_mut(id)
            .and_then(|session| session.stream.take())
    }

    /// Clear the session's stream only if it is still the stream `stream_id`
    pub fn detach_stream_if(&self, id: &str, stream_id: &str) -> Option<SharedStream> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id)?;
        if session.stream.as_ref().is_some_and(|s| s.id() == stream_id) {
            session.stream.take()
        } else {
            None
        }
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.write().remove(id);
        if removed.is_some() {
            debug!("Session {} removed", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::{RealtimeError, StreamHandle};
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Stream handle that records how it was used
    #[derive(Default)]
    struct RecordingStream {
        id: String,
        closed: AtomicBool,
        close_calls: AtomicUsize,
    }

    impl RecordingStream {
        fn shared(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                ..Default::default()
            })
        }
    }

    impl StreamHandle for RecordingStream {
        fn id(&self) -> &str {
            &self.id
        }

        fn push_input(&self, _audio: Bytes) -> Result<(), RealtimeError> {
            Ok(())
        }

        fn send(&self, _audio: Bytes) -> Result<(), RealtimeError> {
            if !self.is_open() {
                return Err(RealtimeError::StreamClosed);
            }
            Ok(())
        }

        fn close(&self) -> bool {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            !self.closed.swap(true, Ordering::SeqCst)
        }

        fn is_open(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_create_then_get_has_no_stream() {
        let registry = SessionRegistry::new();
        for id in ["a", "conn-1", "日本"] {
            registry.create(id);
            let session = registry.get(id).unwrap();
            assert!(!session.has_stream());
        }
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_create_overwrites() {
        let registry = SessionRegistry::new();
        registry.create("a");
        let stream = RecordingStream::shared("s1");
        assert!(matches!(
            registry.attach_stream("a", stream.clone()),
            AttachOutcome::Attached
        ));

        let displaced = registry.create("a").unwrap();
        assert_eq!(displaced.id(), "s1");
        assert!(!registry.get("a").unwrap().has_stream());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_absent() {
        let registry = SessionRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_attach_to_absent_session_leaves_registry_unchanged() {
        let registry = SessionRegistry::new();
        registry.create("present");

        let stream = RecordingStream::shared("s1");
        match registry.attach_stream("absent", stream) {
            AttachOutcome::SessionMissing(handle) => assert_eq!(handle.id(), "s1"),
            _ => panic!("Expected SessionMissing"),
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.get("absent").is_none());
        assert!(!registry.get("present").unwrap().has_stream());
    }

    #[test]
    fn test_attach_replaces_previous() {
        let registry = SessionRegistry::new();
        registry.create("a");
        let _ = registry.attach_stream("a", RecordingStream::shared("s1"));

        match registry.attach_stream("a", RecordingStream::shared("s2")) {
            AttachOutcome::Replaced(previous) => assert_eq!(previous.id(), "s1"),
            _ => panic!("Expected Replaced"),
        }
        assert_eq!(registry.active_stream("a").unwrap().id(), "s2");
    }

    #[test]
    fn test_detach_takes_handle_once() {
        let registry = SessionRegistry::new();
        registry.create("a");
        let _ = registry.attach_stream("a", RecordingStream::shared("s1"));

        assert_eq!(registry.detach_stream("a").unwrap().id(), "s1");
        assert!(registry.detach_stream("a").is_none());
        assert!(registry.detach_stream("missing").is_none());
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn test_detach_if_ignores_stale_stream() {
        let registry = SessionRegistry::new();
        registry.create("a");
        let _ = registry.attach_stream("a", RecordingStream::shared("new"));

        assert!(registry.detach_stream_if("a", "old").is_none());
        assert_eq!(registry.active_stream("a").unwrap().id(), "new");

        assert_eq!(registry.detach_stream_if("a", "new").unwrap().id(), "new");
        assert!(registry.active_stream("a").is_none());
    }

    #[test]
    fn test_stop_then_disconnect_closes_once() {
        let registry = SessionRegistry::new();
        registry.create("a");
        let stream = RecordingStream::shared("s1");
        let _ = registry.attach_stream("a", stream.clone());

        // stopConversation
        if let Some(handle) = registry.detach_stream("a") {
            handle.close();
        }
        // disconnect
        if let Some(session) = registry.remove("a")
            && let Some(handle) = session.stream()
        {
            handle.close();
        }

        assert_eq!(stream.close_calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }
}
