//! The message codec: client intents to bytes, server bytes to events.
//!
//! The rest of the client never touches JSON. The connection manager hands
//! raw frames to a [`MessageCodec`] and gets back either a typed
//! [`InboundEvent`] or a [`DecodeError`] it can log and skip.
//!
//! Decoding runs in two steps: the frame is parsed as a generic JSON
//! object and its `type` tag inspected, then the fields for that type are
//! pulled out one by one. Unknown types and missing fields therefore come
//! back as distinct [`DecodeError`] variants.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    DecodeError, InboundEvent, MatchInfo, OutboundIntent, PlayerEntry,
    ProtocolError,
};

/// Encodes outbound intents and decodes inbound events.
///
/// `Send + Sync + 'static` because the codec is moved into the connection's
/// background task.
pub trait MessageCodec: Send + Sync + 'static {
    /// Serializes an intent into one wire message.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode(&self, intent: &OutboundIntent) -> Result<Vec<u8>, ProtocolError>;

    /// Parses one wire message into an event.
    ///
    /// # Errors
    /// - [`DecodeError::Malformed`]: not a JSON object, or a field has the
    ///   wrong shape
    /// - [`DecodeError::UnknownType`]: missing or unrecognized `type`
    /// - [`DecodeError::MissingField`]: recognized type, required field absent
    fn decode(&self, data: &[u8]) -> Result<InboundEvent, DecodeError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`MessageCodec`] for the JSON text protocol.
///
/// ## Example
///
/// ```rust
/// use matchlink_protocol::{InboundEvent, JsonCodec, MessageCodec, OutboundIntent};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&OutboundIntent::LeaveQueue).unwrap();
/// assert_eq!(bytes, br#"{"type":"leaveQueue"}"#);
///
/// let event = codec
///     .decode(br#"{"type":"queueUpdate","players":[]}"#)
///     .unwrap();
/// assert_eq!(event, InboundEvent::QueueUpdate { players: vec![] });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, intent: &OutboundIntent) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(intent).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<InboundEvent, DecodeError> {
        let mut obj = parse_object(data)?;

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(_) | None => return Err(DecodeError::UnknownType(None)),
        };

        match kind.as_str() {
            "queueUpdate" => {
                let players = take_field(&mut obj, "players")?;
                Ok(InboundEvent::QueueUpdate {
                    players: decode_players(players)?,
                })
            }
            "mapVotesUpdate" => {
                let votes = take_field(&mut obj, "votes")?;
                let votes: BTreeMap<String, u32> = serde_json::from_value(votes)
                    .map_err(|e| malformed(format!("`votes`: {e}")))?;
                Ok(InboundEvent::MapVotesUpdate { votes })
            }
            "matchCreated" => {
                obj.remove("type");
                Ok(InboundEvent::MatchCreated(MatchInfo::new(obj)))
            }
            _ => Err(DecodeError::UnknownType(Some(kind))),
        }
    }
}

impl JsonCodec {
    /// Parses a client message, the way a server would.
    ///
    /// The client itself never needs this; test servers and tooling use it
    /// to check what went out on the wire.
    pub fn decode_intent(&self, data: &[u8]) -> Result<OutboundIntent, DecodeError> {
        let obj = parse_object(data)?;
        match obj.get("type") {
            Some(Value::String(kind))
                if matches!(kind.as_str(), "joinQueue" | "leaveQueue" | "voteMap") => {}
            Some(Value::String(kind)) => {
                return Err(DecodeError::UnknownType(Some(kind.clone())));
            }
            Some(_) | None => return Err(DecodeError::UnknownType(None)),
        }
        serde_json::from_value(Value::Object(obj))
            .map_err(|e| malformed(e.to_string()))
    }

    /// Serializes a server message, the mirror of [`MessageCodec::decode`].
    ///
    /// Used by test servers and tooling to produce frames the client accepts.
    pub fn encode_event(&self, event: &InboundEvent) -> Result<Vec<u8>, ProtocolError> {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::from(event.kind()));
        match event {
            InboundEvent::QueueUpdate { players } => {
                let players =
                    serde_json::to_value(players).map_err(ProtocolError::Encode)?;
                obj.insert("players".into(), players);
            }
            InboundEvent::MapVotesUpdate { votes } => {
                let votes = serde_json::to_value(votes).map_err(ProtocolError::Encode)?;
                obj.insert("votes".into(), votes);
            }
            InboundEvent::MatchCreated(info) => {
                for (key, value) in info.fields() {
                    if key != "type" {
                        obj.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        serde_json::to_vec(&Value::Object(obj)).map_err(ProtocolError::Encode)
    }
}

fn malformed(reason: impl Into<String>) -> DecodeError {
    DecodeError::Malformed(reason.into())
}

fn parse_object(data: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_slice(data) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn take_field(
    obj: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Value, DecodeError> {
    obj.remove(field).ok_or(DecodeError::MissingField(field))
}

fn decode_players(value: Value) -> Result<Vec<PlayerEntry>, DecodeError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(malformed(format!(
                "`players` must be an array, got {}",
                json_kind(&other)
            )));
        }
    };

    items
        .into_iter()
        .map(|item| {
            if !item.is_object() {
                return Err(malformed(format!(
                    "player entry must be an object, got {}",
                    json_kind(&item)
                )));
            }
            for field in ["username", "elo"] {
                if item.get(field).is_none() {
                    return Err(DecodeError::MissingField(field));
                }
            }
            serde_json::from_value(item)
                .map_err(|e| malformed(format!("player entry: {e}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
