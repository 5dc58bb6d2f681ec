/// A partial line longer than this is treated as noise.
pub const MAX_LINE_LEN: usize = 512;

/// Accumulates serial input and splits it into `\n` terminated lines.
#[derive(Debug)]
pub struct LineBuffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl LineBuffer {
    pub fn new() -> LineBuffer {
        LineBuffer {
            data: Vec::with_capacity(128),
            read_pos: 0,
        }
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn len(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.read_pos == self.data.len() {
            self.clear();
        } else if self.read_pos > MAX_LINE_LEN {
            self.data.drain(..self.read_pos);
            self.read_pos = 0;
        }
        let write_pos = self.data.len();
        self.data.extend_from_slice(bytes);
        for byte in self.data[write_pos..].iter_mut() {
            if *byte > 0x7f {
                *byte = b'?'; // map all non-ASCII bytes to '?'
            }
        }
    }

    /// Take the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let pending = &self.data[self.read_pos..];
        let end = pending.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&pending[..end]).into_owned();
        self.read_pos += end + 1;
        Some(line)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.read_pos = 0;
    }
}
