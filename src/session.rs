//! Controller sessions as seen by the protocol core.
//!
//! Session establishment and encryption live outside this crate; the core
//! only needs a stable identity and the per-session event subscription
//! state.

/// Opaque identity of one controller connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

/// Port implemented by the transport layer for each connected controller.
pub trait Session {
    fn id(&self) -> SessionId;

    /// Whether the controller subscribed to events of characteristic
    /// `iid` on accessory `aid` in this session.
    fn are_events_enabled(&self, aid: u64, iid: u64) -> bool;
}
