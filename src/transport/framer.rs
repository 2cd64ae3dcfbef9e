use log::warn;

/// Longest line kept before the framer gives up on it.
pub const DEFAULT_MAX_LINE: usize = 4096;

/// Splits a chunked byte stream into `\n`-terminated lines. Lines with
/// invalid UTF-8 are dropped whole.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE)
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line: max_line.max(1),
            discarding: false,
        }
    }

    /// Feeds one chunk, returning the complete non-empty lines it finished,
    /// in arrival order, with any trailing `\r` removed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                // Tail of an overlong line.
                self.discarding = false;
                continue;
            }
            self.buffer.extend_from_slice(head);
            let raw = std::mem::take(&mut self.buffer);
            if let Some(line) = self.finish_line(raw) {
                lines.push(line);
            }
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            if self.buffer.len() > self.max_line {
                warn!(
                    "Dropping unterminated line longer than {} bytes",
                    self.max_line
                );
                self.buffer.clear();
                self.discarding = true;
            }
        }
        lines
    }

    /// Bytes buffered towards the next line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn finish_line(&self, mut raw: Vec<u8>) -> Option<String> {
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        if raw.is_empty() {
            return None;
        }
        if raw.len() > self.max_line {
            warn!("Dropping {} byte line (limit {})", raw.len(), self.max_line);
            return None;
        }
        match String::from_utf8(raw) {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Dropping line with invalid UTF-8: {}", e.utf8_error());
                None
            }
        }
    }
}
