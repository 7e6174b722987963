//! In-process progress bus: many-times-write, single-reader channels keyed
//! by build id.
//!
//! A channel is created lazily on first publish or first subscribe and is
//! closed by `finish` once the subscriber has observed a terminal message.
//! A finished build id leaves a tombstone instead of being removed, so a
//! straggling publish after teardown is dropped rather than recreating the
//! channel and parking messages nobody will ever read.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use ragdex_core::traits::ProgressSink;

struct Channel {
    tx: UnboundedSender<String>,
    rx: Option<UnboundedReceiver<String>>,
}

enum Slot {
    Open(Channel),
    Finished,
}

#[derive(Default)]
pub struct ProgressBus {
    channels: Mutex<HashMap<String, Slot>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"DONE"` and `"ERROR: ..."` terminate a build's stream.
    pub fn is_terminal(message: &str) -> bool {
        message == "DONE" || message.starts_with("ERROR")
    }

    /// Takes the single receiver for a build id, creating the channel if
    /// the subscriber arrives before the first publish. A second subscriber
    /// gets `None`, as does any subscriber to a finished build.
    pub fn subscribe(&self, build_id: &str) -> Option<UnboundedReceiver<String>> {
        let mut channels = self.channels.lock().ok()?;
        let slot = channels.entry(build_id.to_string()).or_insert_with(new_slot);
        match slot {
            Slot::Open(channel) => channel.rx.take(),
            Slot::Finished => None,
        }
    }

    /// Closes the channel for a build id; called by the consumer after the
    /// terminal message has been delivered.
    pub fn finish(&self, build_id: &str) {
        if let Ok(mut channels) = self.channels.lock() {
            channels.insert(build_id.to_string(), Slot::Finished);
        }
    }
}

fn new_slot() -> Slot {
    let (tx, rx) = unbounded_channel();
    Slot::Open(Channel { tx, rx: Some(rx) })
}

impl ProgressSink for ProgressBus {
    fn publish(&self, build_id: &str, message: &str) {
        let Ok(mut channels) = self.channels.lock() else { return };
        let slot = channels.entry(build_id.to_string()).or_insert_with(new_slot);
        match slot {
            // Fire-and-forget: a closed receiver just drops the message.
            Slot::Open(channel) => {
                let _ = channel.tx.send(message.to_string());
            }
            Slot::Finished => {}
        }
    }
}
