//! The transition rules, one handler per [`EventType`](crate::event::EventType). Every handler
//! refreshes each agent whose event times it changed.

pub(crate) mod host;
pub(crate) mod vector;
