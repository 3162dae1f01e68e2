//! In-memory channel table for the demo channel driver.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use switchboard_cli::{ChannelDirectory, ChannelInfo};

/// Live channels, in creation order.
#[derive(Default)]
pub struct DemoChannels {
    channels: Mutex<Vec<ChannelInfo>>,
    next_id: AtomicU32,
}

impl DemoChannels {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChannelInfo>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bring up a channel running `Echo` at `exten` and return its name.
    pub fn originate(&self, exten: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!("Demo/{exten}-{id:04x}");
        self.lock().push(ChannelInfo {
            name: name.clone(),
            kind: "Demo".into(),
            state: "Up".into(),
            caller_id: Some(format!("<{exten}>")),
            context: "default".into(),
            extension: exten.to_string(),
            priority: 1,
            application: Some("Echo".into()),
            data: Some(String::new()),
            blocking_in: None,
        });
        log::debug!("channel {name} up");
        name
    }

    /// Tear down one channel by name (ASCII case-insensitive).
    pub fn hangup(&self, name: &str) -> bool {
        let mut channels = self.lock();
        let before = channels.len();
        channels.retain(|c| !c.name.eq_ignore_ascii_case(name));
        let removed = channels.len() != before;
        if removed {
            log::debug!("channel {name} hung up");
        }
        removed
    }

    /// Drop every channel.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ChannelDirectory for DemoChannels {
    fn channels(&self) -> Vec<ChannelInfo> {
        self.lock().clone()
    }
}
