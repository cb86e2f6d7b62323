//! Transport trait and types

use std::sync::Arc;

use parking_lot::Mutex;

use super::TransportError;
use crate::vpw::{Header, Message};

/// One decoded bus packet: `header ‖ mode ‖ request echo ‖ data`, checksum removed
pub type Frame = Vec<u8>;

/// Interface the protocol core needs from a bus adapter
///
/// Implementations own the adapter's current addressing header and must
/// apply `message.header()` before transmitting when it differs. One call is
/// one exchange; `&mut self` keeps exchanges from interleaving.
pub trait Transport: Send {
    /// Transmit `message` and return the frames received in reply
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError>;

    /// Header the adapter is currently configured with, if known
    fn current_header(&self) -> Option<Header> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError> {
        (**self).send(message)
    }

    fn current_header(&self) -> Option<Header> {
        (**self).current_header()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError> {
        (**self).send(message)
    }

    fn current_header(&self) -> Option<Header> {
        (**self).current_header()
    }
}

/// Clonable handle that serializes exchanges on one underlying transport
///
/// The lock is held for the whole exchange, so a header switch and the
/// transmission that depends on it can never be split by another caller.
pub struct SharedTransport<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedTransport<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Run `f` with exclusive access to the underlying transport
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<T> Clone for SharedTransport<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Transport for SharedTransport<T> {
    fn send(&mut self, message: &Message) -> Result<Vec<Frame>, TransportError> {
        self.inner.lock().send(message)
    }

    fn current_header(&self) -> Option<Header> {
        self.inner.lock().current_header()
    }
}
