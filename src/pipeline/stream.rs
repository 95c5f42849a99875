//! Incremental decoder for the pipeline's server-sent event stream.
//!
//! Frames arrive as an `event: <name>` line followed by a `data: <json>`
//! line. The event tag is single-use: it is cleared by the next data line
//! whether or not that line decodes.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::types::{QueryResult, Stage, StagePayload};

/// One line of the stream, classified by its field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Event(&'a str),
    Data(&'a str),
    Other,
}

impl<'a> LineKind<'a> {
    /// `field ":" [" "] value`. Comments (empty field), unknown fields and
    /// lines without a colon are `Other`.
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((field, value)) = line.split_once(':') else {
            return Self::Other;
        };
        let value = value.strip_prefix(' ').unwrap_or(value).trim_end();
        match field.trim() {
            "event" => Self::Event(value.trim_start()),
            "data" => Self::Data(value),
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingTag {
    None,
    Pending(String),
}

impl PendingTag {
    fn take(&mut self) -> Option<String> {
        match std::mem::replace(self, PendingTag::None) {
            PendingTag::None => None,
            PendingTag::Pending(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: Stage,
    pub payload: StagePayload,
    pub latency: Duration,
}

pub struct StreamEventParser {
    pending: PendingTag,
    started_at: Instant,
    stage_start: Instant,
    result: QueryResult,
}

impl StreamEventParser {
    /// `started_at` is the moment the request was sent; the first stage's
    /// latency and the total latency are both measured from it.
    pub fn new(started_at: Instant) -> Self {
        Self {
            pending: PendingTag::None,
            started_at,
            stage_start: started_at,
            result: QueryResult::default(),
        }
    }

    pub fn feed_line(&mut self, line: &str) -> Option<StageEvent> {
        self.feed_line_at(line, Instant::now())
    }

    pub fn feed_line_at(&mut self, line: &str, now: Instant) -> Option<StageEvent> {
        match LineKind::classify(line) {
            LineKind::Event(name) => {
                self.pending = PendingTag::Pending(name.to_string());
                None
            }
            LineKind::Data(raw) => {
                let name = self.pending.take()?;
                let data: serde_json::Value = match serde_json::from_str(raw) {
                    Ok(data) => data,
                    Err(e) => {
                        debug!(event = %name, error = %e, "Dropping malformed data frame");
                        return None;
                    }
                };
                self.dispatch(&name, data, now)
            }
            LineKind::Other => None,
        }
    }

    fn dispatch(&mut self, name: &str, data: serde_json::Value, now: Instant) -> Option<StageEvent> {
        let Some(stage) = Stage::from_event_name(name) else {
            if name == "error" {
                let message = data
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                warn!(message = %message, "Pipeline reported an error event");
                self.result.server_error = Some(message);
            }
            return None;
        };

        let latency = now.saturating_duration_since(self.stage_start);
        self.stage_start = now;

        let event = StageEvent {
            stage,
            payload: StagePayload::decode(stage, data),
            latency,
        };
        self.absorb(&event);

        debug!(
            stage = %stage,
            latency_ms = %as_millis(latency),
            "Stage completed"
        );
        Some(event)
    }

    fn absorb(&mut self, event: &StageEvent) {
        self.result
            .stage_latencies
            .insert(event.stage, as_millis(event.latency));

        match &event.payload {
            StagePayload::Generation(results) => {
                self.result.tokens += results.iter().map(|r| r.tokens_used).sum::<u64>();
            }
            StagePayload::Review(reviews) => {
                debug!(reviews = *reviews, "Cross-review received");
            }
            StagePayload::Arbitration(result) => {
                self.result.answer = result.final_answer.clone();
            }
            StagePayload::Verification(result) => {
                self.result.claims = Some(result.claims.clone());
            }
        }
    }

    #[cfg(test)]
    pub fn is_tag_pending(&self) -> bool {
        matches!(self.pending, PendingTag::Pending(_))
    }

    pub fn finish(self) -> QueryResult {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(mut self, now: Instant) -> QueryResult {
        self.result.total_latency_ms = as_millis(now.saturating_duration_since(self.started_at));
        self.result
    }
}

const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Splits arbitrary byte chunks into lines. Bytes are held until a newline
/// arrives so multi-byte characters split across chunks decode intact.
/// Each byte is scanned once; a line longer than the cap is dropped whole.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            max_line: DEFAULT_MAX_LINE_BYTES,
            discarding: false,
        }
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_max_line_bytes(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = (&rest[..pos], &rest[pos + 1..]);
            if self.discarding {
                self.discarding = false;
            } else if self.buf.is_empty() {
                lines.push(decode_line(head));
            } else {
                self.buf.extend_from_slice(head);
                lines.push(decode_line(&self.buf));
                self.buf.clear();
            }
            rest = tail;
        }

        if !self.discarding {
            self.buf.extend_from_slice(rest);
            if self.buf.len() > self.max_line {
                warn!(bytes = self.buf.len(), "Dropping oversized stream line");
                self.buf.clear();
                self.discarding = true;
            }
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    pub fn flush(&mut self) -> Option<String> {
        self.discarding = false;
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode_line(&rest))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

pub(crate) fn as_millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_classify_lines() {
        assert_eq!(LineKind::classify("event: stage1.complete"), LineKind::Event("stage1.complete"));
        assert_eq!(LineKind::classify("event:stage2.complete"), LineKind::Event("stage2.complete"));
        assert_eq!(LineKind::classify("data: {\"a\":1}"), LineKind::Data("{\"a\":1}"));
        assert_eq!(LineKind::classify("data: {\"a\":1}\r"), LineKind::Data("{\"a\":1}"));
        assert_eq!(LineKind::classify(""), LineKind::Other);
        assert_eq!(LineKind::classify(": keep-alive"), LineKind::Other);
        assert_eq!(LineKind::classify("id: 7"), LineKind::Other);
        assert_eq!(LineKind::classify("garbage"), LineKind::Other);
    }

    #[test]
    fn test_one_event_per_complete_pair() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);

        assert!(parser.feed_line_at("event: stage1.complete", t0).is_none());
        assert!(parser.is_tag_pending());
        let event = parser
            .feed_line_at(r#"data: {"results": [{"tokens_used": 5}]}"#, t0 + ms(100))
            .expect("stage event");
        assert_eq!(event.stage, Stage::Stage1);
        assert_eq!(event.latency, ms(100));
        assert!(!parser.is_tag_pending());
    }

    #[test]
    fn test_data_without_tag_ignored() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        assert!(parser.feed_line_at(r#"data: {"results": []}"#, t0).is_none());
        let result = parser.finish_at(t0);
        assert!(result.stage_latencies.is_empty());
    }

    #[test]
    fn test_tag_is_single_use() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: stage2.complete", t0);
        assert!(parser.feed_line_at(r#"data: {"results": []}"#, t0).is_some());
        assert!(parser.feed_line_at(r#"data: {"results": []}"#, t0).is_none());
    }

    #[test]
    fn test_malformed_json_resets_tag() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: stage3.complete", t0);
        assert!(parser.feed_line_at("data: {not json", t0 + ms(10)).is_none());
        assert!(!parser.is_tag_pending());
        assert!(parser
            .feed_line_at(r#"data: {"result": {"final_answer": "x"}}"#, t0 + ms(20))
            .is_none());
        let result = parser.finish_at(t0 + ms(30));
        assert_eq!(result.answer, "");
        assert!(result.stage_latencies.is_empty());
    }

    #[test]
    fn test_blank_lines_between_event_and_data() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: stage1.complete", t0);
        parser.feed_line_at("", t0);
        parser.feed_line_at(": ping", t0);
        assert!(parser
            .feed_line_at(r#"data: {"results": []}"#, t0 + ms(5))
            .is_some());
    }

    #[test]
    fn test_progress_events_do_not_reset_timer() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: stage1.start", t0 + ms(10));
        assert!(parser
            .feed_line_at(r#"data: {"run_id": "r1"}"#, t0 + ms(10))
            .is_none());
        assert!(!parser.is_tag_pending());

        parser.feed_line_at("event: stage1.complete", t0 + ms(50));
        let event = parser
            .feed_line_at(r#"data: {"results": []}"#, t0 + ms(50))
            .unwrap();
        assert_eq!(event.latency, ms(50));
    }

    #[test]
    fn test_sequential_latency_splits_and_totals() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        let frames = [
            ("stage1.complete", r#"{"results": [{"tokens_used": 10}, {"tokens_used": 7}]}"#, 100),
            ("stage2.complete", r#"{"results": [{}]}"#, 250),
            ("stage3.complete", r#"{"result": {"final_answer": "Paris"}}"#, 400),
            ("stage4.complete", r#"{"result": {"claims": [{"label": "verified"}, {"label": "contradicted"}]}}"#, 450),
        ];
        for (name, data, at) in frames {
            parser.feed_line_at(&format!("event: {}", name), t0 + ms(at));
            parser.feed_line_at(&format!("data: {}", data), t0 + ms(at));
        }
        let result = parser.finish_at(t0 + ms(500));

        assert_eq!(result.answer, "Paris");
        assert_eq!(result.tokens, 17);
        assert_eq!(result.stage_latencies[&Stage::Stage1], 100.0);
        assert_eq!(result.stage_latencies[&Stage::Stage2], 150.0);
        assert_eq!(result.stage_latencies[&Stage::Stage3], 150.0);
        assert_eq!(result.stage_latencies[&Stage::Stage4], 50.0);
        assert_eq!(result.total_latency_ms, 500.0);
        assert!(result.stage_latency_sum() <= result.total_latency_ms);

        let counts = result.claim_counts();
        assert_eq!(counts.verified, 1);
        assert_eq!(counts.contradicted, 1);
    }

    #[test]
    fn test_missing_stage3_yields_empty_answer() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: stage1.complete", t0);
        parser.feed_line_at(r#"data: {"results": [{"tokens_used": 3}]}"#, t0 + ms(20));
        let result = parser.finish_at(t0 + ms(40));
        assert_eq!(result.answer, "");
        assert_eq!(result.tokens, 3);
        assert_eq!(result.stage_latencies.len(), 1);
        assert!(result.claims.is_none());
    }

    #[test]
    fn test_error_event_recorded() {
        let t0 = Instant::now();
        let mut parser = StreamEventParser::new(t0);
        parser.feed_line_at("event: error", t0);
        assert!(parser
            .feed_line_at(r#"data: {"message": "model overloaded"}"#, t0)
            .is_none());
        let result = parser.finish_at(t0);
        assert_eq!(result.server_error.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn test_line_buffer_split_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"event: stage").is_empty());
        let lines = buf.push(b"1.complete\r\ndata: {}\n\nda");
        assert_eq!(lines, vec!["event: stage1.complete", "data: {}", ""]);
        assert_eq!(buf.flush().as_deref(), Some("da"));
        assert!(buf.flush().is_none());
    }

    #[test]
    fn test_line_buffer_split_utf8() {
        let text = "data: {\"result\": {\"final_answer\": \"caf\u{e9}\"}}\n";
        let bytes = text.as_bytes();
        let split = text.find('\u{e9}').unwrap() + 1;
        let mut buf = LineBuffer::new();
        assert!(buf.push(&bytes[..split]).is_empty());
        let lines = buf.push(&bytes[split..]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("caf\u{e9}"));
    }

    #[test]
    fn test_line_buffer_many_lines_one_chunk() {
        let mut buf = LineBuffer::new();
        let chunk = "data: {}\n".repeat(1000);
        let lines = buf.push(chunk.as_bytes());
        assert_eq!(lines.len(), 1000);
        assert!(buf.flush().is_none());
    }

    #[test]
    fn test_line_buffer_drops_oversized_line() {
        let mut buf = LineBuffer::new().with_max_line_bytes(16);
        assert!(buf.push(b"data: 0123456789").is_empty());
        assert!(buf.push(b"abcdefghij").is_empty());
        let lines = buf.push(b"klm\nevent: done\n");
        assert_eq!(lines, vec!["event: done"]);
    }
}
