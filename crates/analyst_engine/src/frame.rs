use analyst_logging::analyst_debug;
use encoding_rs::{CoderResult, Decoder, UTF_8};

use crate::ProgressEvent;

const FRAME_DELIMITER: &str = "\n\n";
const DATA_PREFIX: &str = "data:";

/// Incremental decoder for `data: <json>\n\n` frames.
///
/// Bytes are decoded as UTF-8 across chunk boundaries; the trailing partial
/// frame is kept until the next chunk completes it. Frames whose payload does
/// not parse are dropped.
pub struct FrameDecoder {
    decoder: Decoder,
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_without_bom_handling(),
            buffer: String::new(),
        }
    }

    /// Feeds one network chunk and returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.decode(chunk, false);
        self.drain_complete_frames()
    }

    /// Flushes the decoder at end of stream, parsing any unterminated trailing frame.
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        self.decode(&[], true);
        let mut events = self.drain_complete_frames();
        let rest = std::mem::take(&mut self.buffer);
        if !rest.trim().is_empty() {
            events.extend(parse_frame(&rest));
        }
        events
    }

    /// Bytes of text held back waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn decode(&mut self, mut input: &[u8], last: bool) {
        loop {
            if let Some(needed) = self.decoder.max_utf8_buffer_length(input.len()) {
                self.buffer.reserve(needed);
            }
            let (result, read, _had_errors) =
                self.decoder.decode_to_string(input, &mut self.buffer, last);
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => self.buffer.reserve(input.len().max(4) * 3),
            }
        }
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
    }

    fn drain_complete_frames(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(FRAME_DELIMITER) {
            let frame: String = self.buffer.drain(..end + FRAME_DELIMITER.len()).collect();
            events.extend(parse_frame(&frame[..end]));
        }
        events
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_frame(frame: &str) -> Option<ProgressEvent> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if data.is_empty() {
        if !frame.trim().is_empty() {
            analyst_debug!("Dropping frame without data line ({} bytes)", frame.len());
        }
        return None;
    }
    let payload = data.join("\n");
    match ProgressEvent::from_json(&payload) {
        Ok(event) => Some(event),
        Err(err) => {
            analyst_debug!("Dropping undecodable frame ({} bytes): {}", payload.len(), err);
            None
        }
    }
}
