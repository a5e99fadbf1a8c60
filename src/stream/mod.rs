// Streaming answer protocol
//
// Responsibilities:
// - Reassemble transport chunks into complete `data:` lines (reassembler)
// - Classify each line as token / final answer / termination (classifier)
// - Hide transport fragmentation entirely from the transcript layer

mod classifier;
mod reassembler;

pub use classifier::{
    classify_line, classify_payload, frame_payload, parse_structured, FramePayload, StreamEvent,
    FINAL_DISCRIMINANT, FRAME_MARKER, TERMINATION_TOKEN,
};
pub use reassembler::{FrameReassembler, Lines};

/// Reassembler and classifier fused: bytes in, events out.
#[derive(Debug, Default)]
pub struct EventDecoder {
    reassembler: FrameReassembler,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events completed by `chunk`, in arrival order. Lazy, like
    /// [`FrameReassembler::push`]: lines the caller does not pull stay buffered.
    pub fn push<'a>(&'a mut self, chunk: &[u8]) -> impl Iterator<Item = StreamEvent> + 'a {
        self.reassembler.push(chunk).filter_map(|line| classify_line(&line))
    }

    pub fn pending(&self) -> usize {
        self.reassembler.pending()
    }

    /// See [`FrameReassembler::finish`].
    pub fn finish(&mut self) -> usize {
        self.reassembler.finish()
    }
}
