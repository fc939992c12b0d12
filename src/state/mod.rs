//! Toolkit-independent view state. The GTK widgets own one of these each
//! and re-render from it after every change.

pub mod chat_list;
pub mod dialogs;
pub mod notification;
pub mod route;
pub mod search;
pub mod thread;
