// ABOUTME: SSE byte-stream parser — turns raw bytes into typed Frame records
// ABOUTME: Component A: incremental, chunk-fed, bounded by a configurable max line length
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};

use crate::config::ParserConfig;
use crate::error::{StreamError, StreamResult};

/// A single logical SSE record, delimited by a blank line on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: Vec<u8>,
    pub id: Option<String>,
    pub retry: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    /// Render this frame back to wire bytes, following the canonicalization rules
    /// documented for the parser round-trip property (leading-space trim is not
    /// reversible, so round-trip is defined up to that normalization).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.event != "message" {
            out.extend_from_slice(format!("event: {}\n", self.event).as_bytes());
        }
        if let Some(id) = &self.id {
            out.extend_from_slice(format!("id: {id}\n").as_bytes());
        }
        if let Some(retry) = self.retry {
            out.extend_from_slice(format!("retry: {retry}\n").as_bytes());
        }
        if !self.data.is_empty() {
            for line in self.data.split(|&b| b == b'\n') {
                out.extend_from_slice(b"data: ");
                out.extend_from_slice(line);
                out.push(b'\n');
            }
        }
        out.push(b'\n');
        out
    }
}

#[derive(Default)]
struct PartialFrame {
    event: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
    retry: Option<u64>,
    has_content: bool,
}

impl PartialFrame {
    fn build(&self) -> Frame {
        Frame {
            event: self.event.clone().unwrap_or_else(|| "message".to_string()),
            data: self.data_lines.join("\n").into_bytes(),
            id: self.id.clone(),
            retry: self.retry,
            timestamp: Utc::now(),
        }
    }
}

/// Incremental SSE frame parser. Feed it chunks as they arrive off the wire;
/// it yields complete frames as soon as a blank-line delimiter is seen and
/// buffers any trailing partial line across `feed` calls.
pub struct FrameParser {
    buf: Vec<u8>,
    max_line_len: usize,
    current: PartialFrame,
}

impl FrameParser {
    #[must_use]
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            buf: Vec::with_capacity(config.buffer_size),
            max_line_len: config.max_line_len,
            current: PartialFrame::default(),
        }
    }

    /// Feed a chunk of bytes, returning any frames completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> StreamResult<Vec<Frame>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some((consumed, line_end)) = self.next_line_bounds() else {
                if self.buf.len() > self.max_line_len {
                    let size = self.buf.len();
                    let limit = self.max_line_len;
                    self.buf.clear();
                    return Err(StreamError::LineTooLong { size, limit });
                }
                break;
            };

            if line_end > self.max_line_len {
                let limit = self.max_line_len;
                self.buf.drain(0..consumed);
                return Err(StreamError::LineTooLong { size: line_end, limit });
            }

            let line_bytes: Vec<u8> = self.buf.drain(0..consumed).take(line_end).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            process_line(&mut self.current, &line, &mut frames);
        }

        Ok(frames)
    }

    /// Flush any partial frame accumulated at end-of-stream.
    pub fn finish(&mut self) -> Option<Frame> {
        if !self.buf.is_empty() {
            let remaining = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&remaining);
            let mut dummy = Vec::new();
            process_line(&mut self.current, &line, &mut dummy);
        }
        if self.current.has_content {
            let frame = self.current.build();
            self.current = PartialFrame::default();
            Some(frame)
        } else {
            None
        }
    }

    /// Returns `(bytes_to_consume_including_delimiter, line_length_without_delimiter)`
    /// for the next complete line in the buffer, or `None` if no delimiter has
    /// arrived yet.
    fn next_line_bounds(&self) -> Option<(usize, usize)> {
        for i in 0..self.buf.len() {
            match self.buf[i] {
                b'\n' => return Some((i + 1, i)),
                b'\r' => {
                    if i + 1 == self.buf.len() {
                        // Might be a split \r\n — wait for more data.
                        return None;
                    }
                    if self.buf[i + 1] == b'\n' {
                        return Some((i + 2, i));
                    }
                    return Some((i + 1, i));
                }
                _ => {}
            }
        }
        None
    }
}

fn process_line(current: &mut PartialFrame, line: &str, frames: &mut Vec<Frame>) {
    if line.is_empty() {
        if current.has_content {
            frames.push(current.build());
            *current = PartialFrame::default();
        }
        return;
    }
    if line.starts_with(':') {
        return;
    }
    let (field, value) = match line.find(':') {
        Some(pos) => {
            let field = &line[..pos];
            let value = line[pos + 1..].strip_prefix(' ').unwrap_or(&line[pos + 1..]);
            (field, value)
        }
        None => (line, ""),
    };
    match field {
        "event" => {
            current.event = Some(value.to_string());
            current.has_content = true;
        }
        "data" => {
            current.data_lines.push(value.to_string());
            current.has_content = true;
        }
        "id" => {
            current.id = Some(value.to_string());
            current.has_content = true;
        }
        "retry" => {
            if let Ok(ms) = value.parse::<u64>() {
                if ms > 0 {
                    current.retry = Some(ms);
                    current.has_content = true;
                }
            }
        }
        _ => {}
    }
}

/// Parse a complete, already-buffered input in one call. Convenience wrapper
/// for tests and for small non-streamed payloads.
pub fn parse_complete(input: &[u8], config: &ParserConfig) -> StreamResult<Vec<Frame>> {
    let mut parser = FrameParser::new(config);
    let mut frames = parser.feed(input)?;
    if let Some(last) = parser.finish() {
        frames.push(last);
    }
    Ok(frames)
}
