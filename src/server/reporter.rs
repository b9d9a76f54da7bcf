use super::codec::{self, Response};
use std::io::Write;
use tracing::{debug, warn};

/// Writes replies to the host
///
/// Every call to [`message`](Reporter::message), [`success`](Reporter::success)
/// or [`failure`](Reporter::failure) produces exactly one framed document on
/// the response channel, flushed immediately. Nothing is buffered or merged.
pub struct Reporter<'a> {
    output: &'a mut dyn Write,
    sent: usize,
}

impl<'a> Reporter<'a> {
    /// Create a reporter writing to the response channel
    pub fn new(output: &'a mut dyn Write) -> Self {
        Self { output, sent: 0 }
    }

    /// Send a free-form message without an outcome flag
    pub fn message(&mut self, text: &str) {
        self.send(&Response::message(text));
    }

    /// Send a success notification; empty text is omitted
    pub fn success(&mut self, text: &str) {
        self.send(&Response::notification(true, text));
    }

    /// Send a failure notification; empty text is omitted
    pub fn failure(&mut self, text: &str) {
        self.send(&Response::notification(false, text));
    }

    /// Number of replies written so far
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn send(&mut self, response: &Response) {
        let bytes = match codec::encode(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode reply {:?}: {}", response, e);
                return;
            }
        };

        // The host may have gone away; the loop still has to reach its next read.
        match self.output.write_all(&bytes).and_then(|_| self.output.flush()) {
            Ok(()) => {
                self.sent += 1;
                debug!("Sent reply: {}", String::from_utf8_lossy(&bytes));
            }
            Err(e) => warn!("Failed to write reply: {}", e),
        }
    }
}
