use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::ProtocolViolation;

/// Payload records exchanged over the data channel.
///
/// Framing is delegated to the transport's channel abstraction; each record
/// is a self-contained JSON object tagged by `type`:
/// `{"type":"msg","content":…,"isImage":…}` or `{"type":"typing"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ChatPayload {
    /// A chat message. `content` is either plain text or, when `is_image`
    /// is set, an image encoded as a text blob (data URL).
    #[serde(rename = "msg", rename_all = "camelCase")]
    Msg { content: String, is_image: bool },

    /// The remote peer is typing. No body; receipt re-arms the transient
    /// typing indicator.
    #[serde(rename = "typing")]
    Typing,
}

impl ChatPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Msg {
            content: content.into(),
            is_image: false,
        }
    }

    pub fn image(content: impl Into<String>) -> Self {
        Self::Msg {
            content: content.into(),
            is_image: true,
        }
    }

    /// Serialize to the JSON wire record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from a wire record. Oversized or malformed input is a
    /// protocol violation; the caller discards it and keeps the channel open.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolViolation> {
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolViolation::Oversized {
                size: data.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        serde_json::from_slice(data)
            .map_err(|e| ProtocolViolation::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let msg = ChatPayload::text("hello there");
        let bytes = msg.to_bytes().unwrap();
        let restored = ChatPayload::from_bytes(&bytes).unwrap();
        assert_eq!(msg, restored);
    }

    #[test]
    fn test_message_wire_format() {
        let msg = ChatPayload::text("hi");
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(json["type"], "msg");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["isImage"], false);
    }

    #[test]
    fn test_typing_wire_format() {
        let bytes = ChatPayload::Typing.to_bytes().unwrap();
        assert_eq!(bytes, br#"{"type":"typing"}"#);
    }

    #[test]
    fn test_image_payload() {
        let payload = ChatPayload::image("data:image/png;base64,iVBOR");
        match &payload {
            ChatPayload::Msg { is_image, .. } => assert!(is_image),
            _ => panic!("Expected Msg variant"),
        }
        let restored = ChatPayload::from_bytes(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(payload, restored);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = ChatPayload::from_bytes(br#"{"type":"presence"}"#).unwrap_err();
        assert!(matches!(err, ProtocolViolation::MalformedPayload(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(ChatPayload::from_bytes(b"\x00\x01\x02").is_err());
    }

    #[test]
    fn test_oversized_rejected() {
        let data = vec![b'x'; MAX_PAYLOAD_SIZE + 1];
        let err = ChatPayload::from_bytes(&data).unwrap_err();
        assert!(matches!(err, ProtocolViolation::Oversized { .. }));
    }
}
