use mictap_foundation::CaptureError;
use rtrb::{Consumer, Producer, RingBuffer};

/// Lock-free SPSC ring between the device callback and the blocking
/// reader. The producer side lives in the real-time callback and must
/// never block.
pub struct AudioRingBuffer {
    producer: Producer<f32>,
    consumer: Consumer<f32>,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        (
            AudioProducer {
                inner: self.producer,
            },
            AudioConsumer {
                inner: self.consumer,
            },
        )
    }
}

pub struct AudioProducer {
    inner: Producer<f32>,
}

impl AudioProducer {
    /// Writes the whole slice or nothing; partial writes would tear
    /// frames apart across reads.
    pub fn write(&mut self, samples: &[f32]) -> Result<usize, CaptureError> {
        if self.inner.slots() < samples.len() {
            return Err(CaptureError::BufferOverflow {
                count: samples.len(),
            });
        }
        match self.inner.write_chunk_uninit(samples.len()) {
            Ok(chunk) => Ok(chunk.fill_from_iter(samples.iter().copied())),
            Err(_) => Err(CaptureError::BufferOverflow {
                count: samples.len(),
            }),
        }
    }

    /// Free slots remaining.
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}

pub struct AudioConsumer {
    inner: Consumer<f32>,
}

impl AudioConsumer {
    /// Reads up to `out.len()` samples; returns how many were read.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let n = self.inner.slots().min(out.len());
        if n == 0 {
            return 0;
        }
        match self.inner.read_chunk(n) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..first.len() + second.len()].copy_from_slice(second);
                chunk.commit_all();
                n
            }
            Err(_) => 0,
        }
    }

    /// Samples waiting to be read.
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}
