use crate::config::NegotiatedFormat;
use crate::Chunk;

/// Accumulates raw device samples and yields chunks of exactly the
/// configured length.
///
/// Multi-channel input frames (possible only on the event-driven
/// backend's mix-format fallback) are reduced to mono by taking channel
/// 0 of each frame; the remaining channels are ignored, not averaged.
pub struct SampleChunker {
    chunk_samples: usize,
    channels: usize,
    sample_rate_hz: u32,
    buffer: Vec<f32>,
}

impl SampleChunker {
    pub fn new(chunk_samples: usize, format: NegotiatedFormat) -> Self {
        Self {
            chunk_samples,
            channels: format.channels.max(1) as usize,
            sample_rate_hz: format.sample_rate_hz,
            buffer: Vec::with_capacity(chunk_samples),
        }
    }

    /// Pushes interleaved samples; returns every chunk they complete.
    /// Samples past an exact chunk boundary carry over to the next chunk.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Chunk> {
        let mut completed = Vec::new();
        for frame in interleaved.chunks_exact(self.channels) {
            self.buffer.push(frame[0]);
            if self.buffer.len() == self.chunk_samples {
                let samples = std::mem::replace(
                    &mut self.buffer,
                    Vec::with_capacity(self.chunk_samples),
                );
                completed.push(Chunk::new(samples, self.sample_rate_hz));
            }
        }
        completed
    }

    /// Samples accumulated toward the next chunk. Never reaches
    /// `chunk_samples`; whatever is pending at session end is discarded.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(rate: u32) -> NegotiatedFormat {
        NegotiatedFormat {
            sample_rate_hz: rate,
            channels: 1,
        }
    }

    #[test]
    fn emits_nothing_until_full() {
        let mut chunker = SampleChunker::new(8, mono(16_000));
        assert!(chunker.push(&[0.0; 7]).is_empty());
        assert_eq!(chunker.pending(), 7);
    }

    #[test]
    fn carries_excess_over_chunk_boundary() {
        let mut chunker = SampleChunker::new(4, mono(16_000));
        let input: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let chunks = chunker.push(&input);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(chunker.pending(), 2);

        // The carried samples lead the next chunk; nothing duplicated
        // or dropped at the boundary.
        let chunks = chunker.push(&[6.0, 7.0]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples(), &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(chunker.pending(), 0);
    }

    #[test]
    fn reduces_stereo_by_taking_first_channel() {
        let format = NegotiatedFormat {
            sample_rate_hz: 48_000,
            channels: 2,
        };
        let mut chunker = SampleChunker::new(3, format);
        let interleaved = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let chunks = chunker.push(&interleaved);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn multiple_chunks_from_one_push() {
        let mut chunker = SampleChunker::new(2, mono(16_000));
        let chunks = chunker.push(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].samples(), &[0.0, 1.0]);
        assert_eq!(chunks[1].samples(), &[2.0, 3.0]);
        assert_eq!(chunker.pending(), 1);
    }

    #[test]
    fn chunk_carries_capture_rate() {
        let format = NegotiatedFormat {
            sample_rate_hz: 48_000,
            channels: 2,
        };
        let mut chunker = SampleChunker::new(1, format);
        let chunks = chunker.push(&[0.5, 0.0]);
        assert_eq!(chunks[0].sample_rate_hz(), 48_000);
    }
}
