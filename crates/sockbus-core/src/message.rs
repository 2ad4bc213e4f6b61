use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A message flowing through the bus: a topic name and an opaque
/// payload. Immutable once constructed; subscribers receive exactly
/// the published payload bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Structure of frames received from a connected client. The body is
/// re-published verbatim to the named topic.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientFrame {
    pub body: String,
    pub topic: String,
}

impl ClientFrame {
    /// Decode a raw frame. Malformed frames are dropped by the caller,
    /// never fatal to the connection.
    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_holds_payload_verbatim() {
        let msg = Message::new("sports", Bytes::from_static(b"goal!"));
        assert_eq!(msg.topic, "sports");
        assert_eq!(&msg.payload[..], b"goal!");
        assert_eq!(msg.payload_text(), Some("goal!"));
    }

    #[test]
    fn message_payload_text_rejects_invalid_utf8() {
        let msg = Message::new("bin", Bytes::from_static(&[0xff, 0xfe]));
        assert!(msg.payload_text().is_none());
    }

    #[test]
    fn client_frame_decodes() {
        let frame = ClientFrame::decode(br#"{"body":"hi","topic":"sports"}"#).unwrap();
        assert_eq!(frame.body, "hi");
        assert_eq!(frame.topic, "sports");
    }

    #[test]
    fn client_frame_decode_rejects_malformed() {
        assert!(ClientFrame::decode(b"not json").is_err());
        assert!(ClientFrame::decode(br#"{"body":"hi"}"#).is_err());
        assert!(ClientFrame::decode(br#"[1,2,3]"#).is_err());
    }

    #[test]
    fn client_frame_ignores_extra_fields() {
        let frame = ClientFrame::decode(br#"{"body":"b","topic":"t","x":1}"#).unwrap();
        assert_eq!(frame.topic, "t");
    }
}
