//! Helpers shared by unit and integration tests.
//!
//! Remote scenarios run against local TCP listeners: [`twin_server`] hosts real local items keyed
//! by id and speaks the remote line protocol, while [`stub_server`] answers with scripted replies.

pub mod pipeline;
pub mod source;
pub mod stub_server;
pub mod twin_server;
