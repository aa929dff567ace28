//! Protocol-aware chunking of streamed text.

/// Stateful buffer that segments an unbounded text stream into messages of at
/// most `max_chunk_size` bytes, preferring line and word boundaries.
///
/// Split priority: a newline inside the bound, the last space inside the
/// bound, then a hard cut. The chosen split character is consumed; everything
/// else is emitted exactly once, in arrival order.
#[derive(Debug)]
pub struct Chunker {
    buffer: String,
    max_chunk_size: usize,
}

impl Chunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            buffer: String::new(),
            max_chunk_size: max_chunk_size.max(1),
        }
    }

    /// Append text and return any messages that became ready.
    pub fn write(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        self.drain_ready()
    }

    /// Emit whatever remains, regardless of size. Empties the buffer.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    // Extract chunks until the buffer is under the bound with no newline in
    // range. Looping here keeps the invariant that at most one pending
    // segment under the bound survives a write.
    fn drain_ready(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        loop {
            let window = self.max_chunk_size.min(self.buffer.len());
            if let Some(idx) = self.buffer.as_bytes()[..window]
                .iter()
                .position(|&b| b == b'\n')
            {
                let line: String = self.buffer.drain(..=idx).collect();
                let line = &line[..line.len() - 1];
                if !line.is_empty() {
                    out.push(line.to_string());
                }
                continue;
            }
            if self.buffer.len() < self.max_chunk_size {
                break;
            }
            if let Some(chunk) = self.extract_best_split_chunk() {
                out.push(chunk);
            }
        }
        out
    }

    // Take one bound-sized chunk off the front, breaking on the last space in
    // range when there is one.
    fn extract_best_split_chunk(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let end = self.max_chunk_size.min(self.buffer.len());

        if let Some(idx) = self.buffer.as_bytes()[..end]
            .iter()
            .rposition(|&b| b == b' ')
            .filter(|&idx| idx > 0)
        {
            let chunk: String = self.buffer.drain(..=idx).collect();
            let chunk = chunk[..chunk.len() - 1].to_string();
            return (!chunk.is_empty()).then_some(chunk);
        }

        // Hard break: cut at the widest char boundary that fits. A single
        // char wider than the bound is emitted whole to guarantee progress.
        let mut cut = end;
        while cut > 0 && !self.buffer.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = self
                .buffer
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(self.buffer.len());
        }
        let chunk: String = self.buffer.drain(..cut).collect();
        (!chunk.is_empty()).then_some(chunk)
    }
}
