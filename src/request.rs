//! Wire-request parsing.
//!
//! Deserializes the chat-completions-style JSON body the engine
//! receives into a typed request record: numeric id recovered from the
//! `local-chatcmpl-<n>` string, chat messages (plain text or typed
//! content parts), tool definitions, and base64 media payloads with
//! their engine-measured token weights. Template rendering and media
//! decoding happen downstream; this module only gets the data into
//! shape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::{MediaHandle, OpaqueSegment};

/// Prefix of wire-format completion ids.
pub const CHAT_CMPL_ID_PREFIX: &str = "local-chatcmpl-";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request id: {0:?}")]
    InvalidId(String),
    #[error("invalid base64 media payload: {0}")]
    InvalidMedia(#[from] base64::DecodeError),
    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: either a plain string or a list of typed parts
/// (the shapes the upstream prompt builders emit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Base64 data URL or plain base64 payload
    pub url: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    /// Number of embedded images in this message.
    pub fn image_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(_) => 0,
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

/// One media item attached to the request: base64 payload plus the
/// context-window token weight the engine charges for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPart {
    pub data: String,
    pub weight: usize,
}

impl MediaPart {
    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, RequestError> {
        Ok(BASE64.decode(&self.data)?)
    }

    /// The opaque segment this media item occupies in the prompt.
    pub fn to_segment(&self, handle: MediaHandle) -> OpaqueSegment {
        OpaqueSegment::new(self.weight, handle)
    }
}

/// A parsed inference request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub id: u32,
    pub priority: i32,
    pub messages: Vec<ChatMessage>,
    pub tools: serde_json::Value,
    pub media: Vec<MediaPart>,
    pub stop: bool,
}

#[derive(Deserialize)]
struct WireRequest {
    id: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    tools: serde_json::Value,
    #[serde(default)]
    media: Vec<MediaPart>,
    #[serde(default)]
    stop: bool,
}

impl InferenceRequest {
    /// Parse a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        let wire: WireRequest = serde_json::from_str(body)?;
        let id = match wire.id.as_deref() {
            Some(raw) => parse_chat_cmpl_id(raw)?,
            None => 0,
        };
        Ok(Self {
            id,
            priority: wire.priority,
            messages: wire.messages,
            tools: wire.tools,
            media: wire.media,
            stop: wire.stop,
        })
    }

    /// Total embedded images across messages and attached media parts.
    pub fn media_count(&self) -> usize {
        let inline: usize = self.messages.iter().map(ChatMessage::image_count).sum();
        inline + self.media.len()
    }
}

/// Recover the numeric suffix from a `local-chatcmpl-<n>` id.
///
/// Ids without the prefix fall back to 0; a prefixed but non-numeric
/// suffix is rejected.
fn parse_chat_cmpl_id(raw: &str) -> Result<u32, RequestError> {
    match raw.strip_prefix(CHAT_CMPL_ID_PREFIX) {
        Some(suffix) => suffix
            .parse()
            .map_err(|_| RequestError::InvalidId(raw.to_string())),
        None => Ok(0),
    }
}
