//! Server List Ping client.
//!
//! Wire format: every packet is `VarInt length | VarInt packet id | body`.
//! The exchange is handshake (next state = status), status request, status
//! response carrying a JSON document, then an optional ping/pong used for
//! latency. Only the status response decides whether a server is online.

use super::{QueryFailure, QueryResult, SrvResolver, StatusProvider};
use async_trait::async_trait;
use base64::Engine;
use mcwatch_shared::{ServerAddress, StatusSnapshot};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Largest frame accepted from a server
const MAX_FRAME_LEN: usize = 1024 * 1024;

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_ID: i32 = 0x00;
const PING_ID: i32 = 0x01;
const NEXT_STATE_STATUS: i32 = 1;

#[derive(Error, Debug)]
enum ProtocolError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Queries servers with the Server List Ping protocol
#[derive(Clone)]
pub struct SlpProvider {
    timeout: Duration,
    protocol_version: i32,
    srv: Option<SrvResolver>,
}

impl SlpProvider {
    pub fn new(timeout: Duration, protocol_version: i32) -> Self {
        Self {
            timeout,
            protocol_version,
            srv: None,
        }
    }

    /// Resolve SRV records for addresses configured without a port
    pub fn with_srv(mut self, resolver: SrvResolver) -> Self {
        self.srv = Some(resolver);
        self
    }

    async fn connect(&self, address: &ServerAddress) -> Result<(TcpStream, String, u16), ProtocolError> {
        let (host, port) = match &self.srv {
            Some(resolver) => resolver.resolve(address).await,
            None => (address.host().to_string(), address.port()),
        };
        let stream = TcpStream::connect((host.as_str(), port)).await?;
        stream.set_nodelay(true)?;
        Ok((stream, host, port))
    }

    /// Handshake and status request. Ends with the connection still open
    /// so the caller can measure latency on it.
    async fn status(
        &self,
        address: &ServerAddress,
    ) -> Result<(TcpStream, StatusSnapshot, Duration), ProtocolError> {
        let (mut stream, host, port) = self.connect(address).await?;

        let mut handshake = Vec::new();
        write_varint(&mut handshake, self.protocol_version);
        write_string(&mut handshake, &host);
        handshake.extend_from_slice(&port.to_be_bytes());
        write_varint(&mut handshake, NEXT_STATE_STATUS);
        write_frame(&mut stream, HANDSHAKE_ID, &handshake).await?;

        let started = Instant::now();
        write_frame(&mut stream, STATUS_ID, &[]).await?;
        let (id, body) = read_frame(&mut stream).await?;
        let status_rtt = started.elapsed();
        if id != STATUS_ID {
            return Err(ProtocolError::Frame(format!(
                "expected status response, got packet {:#04x}",
                id
            )));
        }
        let mut cursor = body.as_slice();
        let json = read_string(&mut cursor)?;
        let snapshot = parse_status(&json)?;
        Ok((stream, snapshot, status_rtt))
    }
}

#[async_trait]
impl StatusProvider for SlpProvider {
    async fn query(&self, address: &ServerAddress) -> QueryResult {
        let deadline = tokio::time::Instant::now() + self.timeout;

        let (mut stream, mut snapshot, status_rtt) =
            match tokio::time::timeout_at(deadline, self.status(address)).await {
                Ok(Ok(answer)) => answer,
                Ok(Err(e)) => return Err(QueryFailure::new(e.to_string())),
                Err(_) => {
                    return Err(QueryFailure::new(format!(
                        "timed out after {}s",
                        self.timeout.as_secs_f64()
                    )))
                }
            };

        // The status answer already proves the server is up. The ping only
        // refines latency and gets whatever is left of the budget.
        let latency = match tokio::time::timeout_at(deadline, ping(&mut stream)).await {
            Ok(Ok(rtt)) => rtt,
            Ok(Err(e)) => {
                debug!("Ping to {} failed, using status round trip: {}", address, e);
                status_rtt
            }
            Err(_) => {
                debug!("Ping to {} went unanswered, using status round trip", address);
                status_rtt
            }
        };
        snapshot.latency_ms = latency.as_secs_f64() * 1000.0;
        Ok(snapshot)
    }
}

async fn ping<S>(stream: &mut S) -> Result<Duration, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let payload = chrono::Utc::now().timestamp_millis();
    let started = Instant::now();
    write_frame(stream, PING_ID, &payload.to_be_bytes()).await?;
    let (id, body) = read_frame(stream).await?;
    let rtt = started.elapsed();

    if id != PING_ID || body != payload.to_be_bytes() {
        return Err(ProtocolError::Frame("pong does not match ping".to_string()));
    }
    Ok(rtt)
}

// ============================================================================
// Codec
// ============================================================================

fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

/// Decode a VarInt from the front of `cursor`, advancing it
fn decode_varint(cursor: &mut &[u8]) -> Result<i32, ProtocolError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let (&byte, rest) = cursor
            .split_first()
            .ok_or_else(|| ProtocolError::Frame("truncated varint".to_string()))?;
        *cursor = rest;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProtocolError::Frame("varint longer than 5 bytes".to_string()))
}

async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, ProtocolError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProtocolError::Frame("varint longer than 5 bytes".to_string()))
}

fn read_string(cursor: &mut &[u8]) -> Result<String, ProtocolError> {
    let len = decode_varint(cursor)?;
    let len = usize::try_from(len)
        .map_err(|_| ProtocolError::Frame(format!("negative string length {}", len)))?;
    if len > cursor.len() {
        return Err(ProtocolError::Frame(format!(
            "string length {} exceeds frame",
            len
        )));
    }
    let (bytes, rest) = cursor.split_at(len);
    *cursor = rest;
    String::from_utf8(bytes.to_vec()).map_err(|e| ProtocolError::Frame(e.to_string()))
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    id: i32,
    body: &[u8],
) -> Result<(), ProtocolError> {
    let mut packet = Vec::with_capacity(body.len() + 1);
    write_varint(&mut packet, id);
    packet.extend_from_slice(body);

    let mut frame = Vec::with_capacity(packet.len() + 5);
    write_varint(&mut frame, packet.len() as i32);
    frame.extend_from_slice(&packet);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame, returning its packet id and body
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(i32, Vec<u8>), ProtocolError> {
    let len = read_varint(reader).await?;
    let len = usize::try_from(len)
        .ok()
        .filter(|len| (1..=MAX_FRAME_LEN).contains(len))
        .ok_or_else(|| ProtocolError::Frame(format!("bad frame length {}", len)))?;

    let mut packet = vec![0u8; len];
    reader.read_exact(&mut packet).await?;

    let mut cursor = packet.as_slice();
    let id = decode_varint(&mut cursor)?;
    Ok((id, cursor.to_vec()))
}

// ============================================================================
// Status document
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    version: Option<RawVersion>,
    #[serde(default)]
    players: Option<RawPlayers>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    favicon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    #[serde(default)]
    max: u32,
    #[serde(default)]
    online: u32,
    #[serde(default)]
    sample: Option<Vec<RawSample>>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    name: String,
}

fn parse_status(json: &str) -> Result<StatusSnapshot, ProtocolError> {
    let raw: RawStatus = serde_json::from_str(json)?;

    let (players_online, players_max, players) = match raw.players {
        Some(p) => {
            let names: BTreeSet<String> = p
                .sample
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.name)
                .collect();
            (p.online, p.max, names)
        }
        None => (0, 0, BTreeSet::new()),
    };

    Ok(StatusSnapshot {
        online: true,
        players,
        players_online,
        players_max,
        latency_ms: 0.0,
        motd: raw
            .description
            .as_ref()
            .map(|d| strip_formatting(&flatten_text(d)))
            .unwrap_or_default(),
        version: raw.version.map(|v| v.name).unwrap_or_default(),
        icon: raw.favicon.as_deref().and_then(decode_favicon),
    })
}

/// Concatenate the text of a chat component tree
fn flatten_text(component: &Value) -> String {
    match component {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().map(flatten_text).collect(),
        Value::Object(map) => {
            let mut out = map
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(Value::Array(extra)) = map.get("extra") {
                for part in extra {
                    out.push_str(&flatten_text(part));
                }
            }
            out
        }
        _ => String::new(),
    }
}

/// Drop legacy `§x` formatting codes
fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_favicon(favicon: &str) -> Option<Vec<u8>> {
    let payload = favicon.strip_prefix("data:image/png;base64,")?;
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(cleaned).ok()
}
