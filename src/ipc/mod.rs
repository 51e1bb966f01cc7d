//! Control socket.
//!
//! Scripts and key-bind helpers can connect to the socket and send
//! newline-delimited JSON [`Command`](crate::command::Command)s, the same
//! ones the indicator context menus send.

pub mod listener;

pub use listener::{default_socket_path, UnixSocketListener, UnixSocketError};
