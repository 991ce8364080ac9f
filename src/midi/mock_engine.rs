use crate::midi::{MidiError, MidiSink, Result};
use std::sync::{Arc, Mutex};

/// Sink that keeps every written message, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Vec<Vec<u8>>,
    offsets: Vec<u32>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Vec<u8>] {
        &self.messages
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// All written bytes, concatenated in write order.
    pub fn bytes(&self) -> Vec<u8> {
        self.messages.concat()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.offsets.clear();
    }
}

impl MidiSink for RecordingSink {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        if self.fail {
            return Err(MidiError::SendError("recording sink is closed".to_string()));
        }
        self.messages.push(bytes.to_vec());
        self.offsets.push(offset);
        Ok(())
    }
}

/// Lets a test keep a handle on a sink that has been moved into the engine.
impl MidiSink for Arc<Mutex<RecordingSink>> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        self.lock()
            .map_err(|_| MidiError::SendError("recording sink poisoned".to_string()))?
            .write(offset, bytes)
    }
}
