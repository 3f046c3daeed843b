//! Bounded timeout-aware queues connecting the read loop to waiting callers.
//!
//! A [`Pipe`] is a single-producer-ish, single-consumer bounded channel with
//! explicit timeouts on both ends and an idempotent close. Closing wakes any
//! blocked consumer; messages already buffered stay consumable so a reply
//! that raced the close is not lost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, watch};

use crate::error::ClientError;

/// A bounded queue with timeout-aware blocking on both ends.
#[derive(Debug)]
pub struct Pipe<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
    closed: watch::Sender<bool>,
    closed_flag: AtomicBool,
}

impl<T> Pipe<T> {
    /// Create a pipe with the given bounded capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            tx,
            rx: Mutex::new(rx),
            closed,
            closed_flag: AtomicBool::new(false),
        }
    }

    /// Enqueue a value, blocking up to `timeout` while the pipe is full.
    pub async fn produce(&self, value: T, timeout: Duration) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }
        self.tx
            .send_timeout(value, timeout)
            .await
            .map_err(|err| match err {
                mpsc::error::SendTimeoutError::Timeout(_) => ClientError::Timeout {
                    seconds: timeout.as_secs_f64(),
                },
                mpsc::error::SendTimeoutError::Closed(_) => ClientError::ConnectionClosed,
            })
    }

    /// Dequeue one value, blocking up to `timeout` while the pipe is empty.
    ///
    /// Values buffered before a close are still delivered; once drained, a
    /// closed pipe reports [`ClientError::ConnectionClosed`].
    pub async fn consume(&self, timeout: Duration) -> Result<T, ClientError> {
        let mut rx = self.rx.lock().await;
        match rx.try_recv() {
            Ok(value) => return Ok(value),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(ClientError::ConnectionClosed);
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
        }
        if self.is_closed() {
            return Err(ClientError::ConnectionClosed);
        }
        let mut closed = self.closed.subscribe();
        tokio::select! {
            // Delivery wins over close: when a reply and the close race, the
            // biased order hands the buffered value to the waiting caller.
            biased;
            value = rx.recv() => value.ok_or(ClientError::ConnectionClosed),
            // wait_for re-checks the current value, so a close that raced the
            // subscription is still observed.
            _ = closed.wait_for(|c| *c) => {
                // One more drain: the producer may have slipped a value in
                // just before closing.
                rx.try_recv().map_err(|_| ClientError::ConnectionClosed)
            }
            () = tokio::time::sleep(timeout) => Err(ClientError::Timeout {
                seconds: timeout.as_secs_f64(),
            }),
        }
    }

    /// Mark the pipe closed and wake any blocked consumer. Idempotent.
    pub fn close(&self) {
        if !self.closed_flag.swap(true, Ordering::SeqCst) {
            // send_replace updates the value even with no live subscriber.
            self.closed.send_replace(true);
        }
    }

    /// Whether the pipe has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed_flag.load(Ordering::SeqCst)
    }
}

/// Pull-based adapter over a streaming reply pipe.
///
/// Each `next` call blocks for the following item; idle gaps between pushed
/// items are waited out, and a closed pipe ends the stream with `Ok(None)`.
#[derive(Debug, Clone)]
pub struct StreamAdapter {
    pipe: Arc<Pipe<Value>>,
    timeout: Duration,
}

impl StreamAdapter {
    /// Wrap a registered pipe with a per-item timeout.
    pub fn new(pipe: Arc<Pipe<Value>>, timeout: Duration) -> Self {
        Self { pipe, timeout }
    }

    /// The next raw item, or `None` once the pipe is closed and drained.
    pub async fn next(&self) -> Result<Option<Value>, ClientError> {
        loop {
            match self.pipe.consume(self.timeout).await {
                Ok(value) => return Ok(Some(value)),
                // An idle gap between pushed items is not a stream error.
                Err(ClientError::Timeout { .. }) => {}
                Err(ClientError::ConnectionClosed) => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }

    /// The next item decoded into `T`.
    pub async fn next_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ClientError> {
        match self.next().await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| ClientError::DataBinding {
                    cause: err.to_string(),
                }),
        }
    }

    /// Stop the stream by closing the underlying pipe.
    pub fn close(&self) {
        self.pipe.close();
    }
}
