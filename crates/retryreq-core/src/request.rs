//! Request payloads and best-effort diagnostic rendering.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// A pre-built request payload. Signing and headers are the executor's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Structured request descriptor; serialized to JSON for the wire.
    Descriptor(Value),
    /// Already-serialized JSON bytes, sent as-is.
    Raw(Vec<u8>),
}

impl Request {
    /// Build a descriptor request from any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Ok(Request::Descriptor(serde_json::to_value(value)?))
    }

    /// Wire bytes for this request.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Request::Descriptor(v) => serde_json::to_vec(v),
            Request::Raw(b) => Ok(b.clone()),
        }
    }

    /// Payload size in bytes, as far as it can be known without serializing.
    fn approx_len(&self) -> usize {
        match self {
            Request::Descriptor(v) => serde_json::to_vec(v).map(|b| b.len()).unwrap_or(0),
            Request::Raw(b) => b.len(),
        }
    }

    /// One-line form used in error messages.
    pub fn summary(&self) -> String {
        compact(self).unwrap_or_else(|| identifier_only(self))
    }
}

/// Render a request for an operator log line. Never fails: falls back from
/// tab-indented JSON to compact text to a size-only identifier.
pub fn render_for_diagnostics(request: &Request) -> String {
    indented(request)
        .or_else(|| compact(request))
        .unwrap_or_else(|| identifier_only(request))
}

fn indented(request: &Request) -> Option<String> {
    let value = match request {
        Request::Descriptor(v) => v.clone(),
        Request::Raw(b) => serde_json::from_slice::<Value>(b).ok()?,
    };
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}

fn compact(request: &Request) -> Option<String> {
    match request {
        Request::Descriptor(v) => serde_json::to_string(v).ok(),
        Request::Raw(b) => std::str::from_utf8(b).ok().map(str::to_string),
    }
}

fn identifier_only(request: &Request) -> String {
    format!("<unrenderable request: {} bytes>", request.approx_len())
}
