use axum::response::sse::Event;
use broker::InboundMessage;

/// Encodes one broker message as one SSE event carrying the payload as text.
///
/// On the wire a single-line payload `A` becomes `data: A\n\n`. Multi-line payloads are
/// split across several `data:` lines, which clients join back with newlines.
pub fn encode(message: &InboundMessage) -> Event {
    Event::default().data(payload_text(&message.payload))
}

/// Decodes the payload as UTF-8 (invalid sequences become U+FFFD) and normalizes line
/// endings, since SSE fields cannot carry carriage returns.
pub fn payload_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}
