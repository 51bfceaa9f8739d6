//! Shared ShowroomStream protocol helpers.
//!
//! The protocol sends a fixed-size header followed by a MessagePack payload.
//! The state engine and the control/rendering surface both link this crate so
//! framing and payload shapes stay interoperable.

use std::convert::TryFrom;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

/// Bytes that prefix every ShowroomStream message ("SHOW").
pub const HEADER_MAGIC: [u8; 4] = *b"SHOW";

/// Protocol revision understood by this crate.
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Length of the binary header in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 4;

/// Message kinds understood by ShowroomStream v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, Hash)]
#[repr(u16)]
pub enum MessageKind {
    Hello = 0x0001,
    Control = 0x0002,
    LoadAsset = 0x0003,
    LoadResult = 0x0004,
    StateUpdate = 0x0005,
    ArProbe = 0x0006,
    Notice = 0x0007,
    Heartbeat = 0x0008,
}

/// Envelope describing the upcoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u16,
    pub kind: MessageKind,
    pub length: u32,
}

impl MessageHeader {
    /// Encode the header as big-endian bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&HEADER_MAGIC);
        out[4..6].copy_from_slice(&self.version.to_be_bytes());
        out[6..8].copy_from_slice(&(self.kind as u16).to_be_bytes());
        out[8..12].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    /// Decode a header from raw bytes.
    pub fn decode(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader);
        }
        if &input[..4] != HEADER_MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let mut version_bytes = &input[4..6];
        let version = version_bytes.get_u16();
        let mut kind_bytes = &input[6..8];
        let kind_raw = kind_bytes.get_u16();
        let kind = MessageKind::try_from(kind_raw)
            .map_err(|_| ProtocolError::UnknownMessageKind(kind_raw))?;
        let mut len_bytes = &input[8..12];
        let length = len_bytes.get_u32();
        Ok(Self {
            version,
            kind,
            length,
        })
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = ();

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(Self::Hello),
            0x0002 => Ok(Self::Control),
            0x0003 => Ok(Self::LoadAsset),
            0x0004 => Ok(Self::LoadResult),
            0x0005 => Ok(Self::StateUpdate),
            0x0006 => Ok(Self::ArProbe),
            0x0007 => Ok(Self::Notice),
            0x0008 => Ok(Self::Heartbeat),
            _ => Err(()),
        }
    }
}

/// Minimal handshake message that opens a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub protocol: String,
    pub producer: String,
    pub build: Option<String>,
}

impl Hello {
    pub fn new(producer: impl Into<String>, build: Option<String>) -> Self {
        Self {
            protocol: "ShowroomStream".to_string(),
            producer: producer.into(),
            build,
        }
    }
}

/// Day/night presentation theme persisted across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Day,
    Night,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Day => Theme::Night,
            Theme::Night => Theme::Day,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Day => "day",
            Theme::Night => "night",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Day
    }
}

/// Visual filter channels adjustable from the panel sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Brightness,
    Contrast,
    Exposure,
}

/// Slider values applied to the rendering surface; 1.0 is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub brightness: f32,
    pub contrast: f32,
    pub exposure: f32,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            exposure: 1.0,
        }
    }
}

/// Orbit camera description mirrored to the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub theta_deg: f32,
    pub phi_deg: f32,
    pub radius_m: f32,
    pub target: [f32; 3],
    pub fov_deg: f32,
}

/// Panel request forwarded from the control surface to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    SelectProduct {
        product_id: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        variant_asset: Option<String>,
    },
    SelectVariant {
        index: u32,
    },
    SetFilter {
        kind: FilterKind,
        value: f32,
    },
    ResetView,
    ResetFilters,
    SetTheme {
        theme: Theme,
    },
    RequestShare,
    RequestAr,
    /// Interactive camera drift reported back by the rendering surface.
    ReportCameraPose {
        pose: CameraPose,
    },
}

/// Asset-load instruction issued by the engine. The token is monotonically
/// increasing; completions carrying an older token must be discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAsset {
    pub token: u64,
    pub asset: String,
}

/// Completion signal for a previously issued load instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub token: u64,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadOutcome {
    Ready,
    Failed { reason: String },
}

/// AR capability probe answered by the platform surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArProbe {
    pub supported: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<String>,
}

/// Severity for user-visible notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible report (load failures, clipboard outcomes, catalog banners).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(default)]
    pub detail: Value,
}

fn vec_is_empty<T>(vec: &Vec<T>) -> bool {
    vec.is_empty()
}

/// Run-time state snapshot published by the engine after every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub seq: u64,
    pub host_time_ns: u64,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub variant_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub variant_asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub camera: Option<CameraPose>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filters: Option<Filters>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub share_url: Option<String>,
    #[serde(skip_serializing_if = "vec_is_empty", default)]
    pub events: Vec<String>,
}

/// Liveness ping sent while no state changes are flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub host_time_ns: u64,
}

/// Error conditions returned by the protocol helpers.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("header smaller than {HEADER_LEN} bytes")]
    TruncatedHeader,
    #[error("header magic mismatch")]
    BadMagic,
    #[error("message kind {0:#06x} is unknown")]
    UnknownMessageKind(u16),
    #[error("payload length mismatch: header declared {expected} bytes but read {actual}")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
}

/// Wraps a payload with framing suitable for the wire.
pub fn encode_message<T>(kind: MessageKind, payload: &T) -> Result<Vec<u8>, ProtocolError>
where
    T: Serialize,
{
    let payload_bytes = rmp_serde::to_vec_named(payload)?;
    let header = MessageHeader {
        version: PROTOCOL_VERSION,
        kind,
        length: u32::try_from(payload_bytes.len()).map_err(|_| ProtocolError::LengthMismatch {
            expected: u32::MAX,
            actual: payload_bytes.len(),
        })?,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload_bytes.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Decodes a framed message returning both header and payload bytes.
pub fn decode_envelope(bytes: &[u8]) -> std::result::Result<(MessageHeader, &[u8]), ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader);
    }
    let header = MessageHeader::decode(&bytes[..HEADER_LEN])?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.length as usize {
        return Err(ProtocolError::LengthMismatch {
            expected: header.length,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

/// Decode a payload straight into the requested type.
pub fn decode_payload<T>(payload: &[u8]) -> std::result::Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = rmp_serde::from_slice(payload)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_request_round_trips_through_framing() {
        let request = ControlRequest::SelectProduct {
            product_id: "sofa1".to_string(),
            variant_asset: Some("sofa_cream.glb".to_string()),
        };

        let bytes = encode_message(MessageKind::Control, &request).unwrap();
        let (header, payload) = decode_envelope(&bytes).unwrap();
        assert_eq!(header.kind, MessageKind::Control);
        assert_eq!(header.version, PROTOCOL_VERSION);

        let decoded: ControlRequest = decode_payload(payload).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn load_result_round_trips() {
        let result = LoadResult {
            token: 7,
            outcome: LoadOutcome::Failed {
                reason: "404".to_string(),
            },
        };
        let bytes = encode_message(MessageKind::LoadResult, &result).unwrap();
        let (_, payload) = decode_envelope(&bytes).unwrap();
        let decoded: LoadResult = decode_payload(payload).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(matches!(
            MessageHeader::decode(&[0u8; 4]),
            Err(ProtocolError::TruncatedHeader)
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Heartbeat,
            length: 0,
        }
        .encode();
        bytes[0] = b'X';
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::BadMagic)
        ));
    }

    #[test]
    fn declared_length_must_match_payload() {
        let heartbeat = Heartbeat { host_time_ns: 1 };
        let mut bytes = encode_message(MessageKind::Heartbeat, &heartbeat).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode_envelope(&bytes),
            Err(ProtocolError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn unknown_kind_is_reported_with_raw_value() {
        let mut bytes = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Hello,
            length: 0,
        }
        .encode();
        bytes[6..8].copy_from_slice(&0x00ffu16.to_be_bytes());
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::UnknownMessageKind(0x00ff))
        ));
    }
}
