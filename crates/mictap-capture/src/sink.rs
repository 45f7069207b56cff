use crate::Chunk;
use parking_lot::RwLock;
use std::sync::Arc;

/// Chunk consumer installed by the bridging layer.
pub type ChunkSink = Arc<dyn Fn(Chunk) + Send + Sync>;

/// Single-slot sink registration.
///
/// Installing replaces the previous sink and applies from the next
/// delivered chunk. A replacement racing an in-flight delivery is
/// last-write-wins: both the old and the new sink are valid targets for
/// "next" data, so no barrier is provided.
#[derive(Clone, Default)]
pub struct SinkSlot {
    slot: Arc<RwLock<Option<ChunkSink>>>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<F>(&self, sink: F)
    where
        F: Fn(Chunk) + Send + Sync + 'static,
    {
        *self.slot.write() = Some(Arc::new(sink));
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_installed(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Delivers to whichever sink is installed at this instant. Returns
    /// false when none is, and the chunk is discarded.
    pub fn deliver(&self, chunk: Chunk) -> bool {
        let sink = self.slot.read().clone();
        match sink {
            Some(sink) => {
                sink(chunk);
                true
            }
            None => false,
        }
    }
}
