//! Keyed pipe and stream-adapter registries shared with the read loop.
//!
//! The read loop routes inbound messages by looking pipes up here, so a pipe
//! must be registered before its request is sent. Static request-type keys
//! are registered once and reused; correlation-id keys come and go per call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use super::pipe::Pipe;

/// Keyed table of reply pipes.
#[derive(Debug, Default)]
pub struct PipeRegistry {
    pipes: Mutex<HashMap<String, Arc<Pipe<Value>>>>,
}

impl PipeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipe under `key`, reusing an existing live binding.
    ///
    /// Static request-type pipes survive across calls; reusing the binding
    /// keeps replies that arrived between calls consumable.
    pub fn register(&self, key: &str, capacity: usize) -> Arc<Pipe<Value>> {
        let mut pipes = self.pipes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = pipes.get(key) {
            if !existing.is_closed() {
                return Arc::clone(existing);
            }
        }
        let pipe = Arc::new(Pipe::new(capacity));
        pipes.insert(key.to_string(), Arc::clone(&pipe));
        pipe
    }

    /// Look up the pipe registered under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<Pipe<Value>>> {
        self.pipes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(Arc::clone)
    }

    /// Remove and close the pipe registered under `key`.
    pub fn deregister(&self, key: &str) {
        let removed = self
            .pipes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if let Some(pipe) = removed {
            pipe.close();
        }
    }

    /// Close and drop every registered pipe.
    pub fn close_all(&self) {
        let mut pipes = self.pipes.lock().unwrap_or_else(PoisonError::into_inner);
        for pipe in pipes.values() {
            pipe.close();
        }
        pipes.clear();
    }
}

/// Tracks the pipes backing live stream adapters so close can end them all.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Mutex<Vec<Arc<Pipe<Value>>>>,
}

impl StreamRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a streaming pipe for connection-wide close.
    pub fn track(&self, pipe: Arc<Pipe<Value>>) {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.retain(|p| !p.is_closed());
        streams.push(pipe);
    }

    /// Close every tracked stream.
    pub fn close_all(&self) {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        for pipe in streams.drain(..) {
            pipe.close();
        }
    }
}
