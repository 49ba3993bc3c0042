//! Opaque mailbox payloads.

use core::fmt;
use std::any::{Any, TypeId};

/// An owned, type-erased message.
///
/// Mailboxes carry `Message`s; the receiving side recovers the concrete type
/// with [`Message::downcast`]. A failed downcast hands the message back
/// unchanged so the caller can try another type or drop it.
pub struct Message {
    payload: Box<dyn Any>,
    type_name: &'static str,
}

impl Message {
    /// Wraps a value as a message.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            payload: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns true if the payload is a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Borrows the payload as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Recovers the payload as a `T`, or returns the message unchanged.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self { payload, type_name } = self;
        match payload.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(payload) => Err(Self { payload, type_name }),
        }
    }

    /// Returns the payload's type name, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the payload's `TypeId`.
    #[must_use]
    pub fn payload_type_id(&self) -> TypeId {
        (*self.payload).type_id()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_round_trip() {
        let msg = Message::new(41_i32);
        assert!(msg.is::<i32>());
        assert_eq!(msg.downcast_ref::<i32>(), Some(&41));
        assert_eq!(msg.downcast::<i32>().ok(), Some(41));
    }

    #[test]
    fn failed_downcast_returns_message() {
        let msg = Message::new(String::from("hello"));
        let msg = msg.downcast::<i32>().unwrap_err();
        assert!(msg.type_name().ends_with("String"));
        assert_eq!(msg.payload_type_id(), TypeId::of::<String>());
        assert_eq!(msg.downcast::<String>().ok().as_deref(), Some("hello"));
    }
}
