//! Live reload: file watching and reload fan-out to viewer sessions.

mod hub;
mod watcher;
mod websocket;

pub(crate) use hub::ReloadHub;
pub(crate) use watcher::FileWatcher;
pub(crate) use websocket::ws_handler;
