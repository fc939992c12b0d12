pub mod channel;
pub mod codec;

pub use channel::{Listener, PushChannel, PushEvent, Subscription, NEW_MESSAGE_EVENT};
