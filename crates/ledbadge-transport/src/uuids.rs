//! GATT characteristic UUIDs for the LED badge's RCSP service. These are
//! opaque to `ledbadge-core`/`ledbadge-client`
//! — only this adapter crate needs to know them.

use uuid::{Uuid, uuid};

/// Data-W (`AE01`): host→device, raw auth bytes / FE commands / FE data frames.
pub const DATA_WRITE: Uuid = uuid!("0000ae01-0000-1000-8000-00805f9b34fb");
/// Data-N (`AE02`): device→host, FE responses and notifications.
pub const DATA_NOTIFY: Uuid = uuid!("0000ae02-0000-1000-8000-00805f9b34fb");
/// Ctrl-W (`FD02`): host→device, 9E control writes (primary).
pub const CTRL_WRITE_PRIMARY: Uuid = uuid!("0000fd02-0000-1000-8000-00805f9b34fb");
/// Ctrl-W (`FD04`): host→device, 9E control writes (secondary).
pub const CTRL_WRITE_SECONDARY: Uuid = uuid!("0000fd04-0000-1000-8000-00805f9b34fb");
/// Ctrl-N (`FD01`): device→host, 9E notifications, info sub-channel.
pub const CTRL_NOTIFY_INFO: Uuid = uuid!("0000fd01-0000-1000-8000-00805f9b34fb");
/// Ctrl-N (`FD03`): device→host, 9E notifications, ready sub-channel.
pub const CTRL_NOTIFY_READY: Uuid = uuid!("0000fd03-0000-1000-8000-00805f9b34fb");
/// Ctrl-N (`FD05`): device→host, 9E notifications, other sub-channel.
pub const CTRL_NOTIFY_OTHER: Uuid = uuid!("0000fd05-0000-1000-8000-00805f9b34fb");
