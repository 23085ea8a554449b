pub mod bridge;
pub mod ui_channel;
pub mod wait;

pub use bridge::BridgeChannel;
pub use ui_channel::{UiChannel, WindowHandle, WindowInfo};
pub use wait::{settle, wait_until, PollPolicy};
