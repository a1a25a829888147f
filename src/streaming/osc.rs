//! OSC 1.0 packet codec
//!
//! Decodes the subset of Open Sound Control used by eye tracker feeders.
//! All values are big-endian and every field is padded to a 4-byte boundary.
//!
//! # Message Layout
//!
//! ```text
//! ┌────────────────────┬──────────────────────┬────────────────────┐
//! │ Address "/a/b\0.." │ Type tags ",ffff\0.."│ Arguments          │
//! │ padded to 4 bytes  │ padded to 4 bytes    │ 4/8 bytes or padded│
//! └────────────────────┴──────────────────────┴────────────────────┘
//! ```
//!
//! # Bundle Layout
//!
//! ```text
//! ┌────────────┬──────────────┬──────────────┬─────────┬─────
//! │ "#bundle\0"│ Timetag (u64)│ Size (i32)   │ Element │ ...
//! └────────────┴──────────────┴──────────────┴─────────┴─────
//! ```
//!
//! # Supported Argument Tags
//!
//! | Tag | Type |
//! |-----|------|
//! | `i` | int32 |
//! | `f` | float32 |
//! | `s`, `S` | string / symbol |
//! | `b` | blob |
//! | `h` | int64 |
//! | `t` | timetag |
//! | `d` | float64 |
//! | `c` | char (as int32) |
//! | `T`, `F` | true / false (no payload) |
//! | `N` | nil (no payload) |
//! | `I` | impulse / infinitum (no payload) |

use thiserror::Error;

/// Bundle header including terminator
const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Nested bundles deeper than this are rejected
const MAX_BUNDLE_DEPTH: usize = 8;

/// OSC decode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OscError {
    #[error("Packet truncated at offset {offset} (needed {needed} bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("String at offset {0} is not terminated")]
    UnterminatedString(usize),

    #[error("String at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("Invalid address pattern: {0:?}")]
    InvalidAddress(String),

    #[error("Type tag string must start with ','")]
    MissingTypeTags,

    #[error("Unsupported type tag '{0}'")]
    UnknownTypeTag(char),

    #[error("Invalid bundle element size {0}")]
    InvalidElementSize(i32),

    #[error("Bundles nested too deeply")]
    BundleTooDeep,

    #[error("{0} trailing bytes after message arguments")]
    TrailingBytes(usize),
}

/// A single OSC argument
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Vec<u8>),
    Long(i64),
    Time(u64),
    Double(f64),
    Char(char),
    Bool(bool),
    Nil,
    Inf,
}

impl OscArg {
    /// Type tag character for this argument
    pub fn tag(&self) -> char {
        match self {
            Self::Int(_) => 'i',
            Self::Float(_) => 'f',
            Self::String(_) => 's',
            Self::Blob(_) => 'b',
            Self::Long(_) => 'h',
            Self::Time(_) => 't',
            Self::Double(_) => 'd',
            Self::Char(_) => 'c',
            Self::Bool(true) => 'T',
            Self::Bool(false) => 'F',
            Self::Nil => 'N',
            Self::Inf => 'I',
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// OSC message: address pattern plus typed arguments
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

/// OSC bundle: timetag plus nested packets
#[derive(Debug, Clone, PartialEq)]
pub struct OscBundle {
    pub timetag: u64,
    pub content: Vec<OscPacket>,
}

/// Top-level OSC packet (one UDP datagram)
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    Message(OscMessage),
    Bundle(OscBundle),
}

impl OscPacket {
    /// All messages in the packet, bundles flattened in order
    pub fn messages(&self) -> Vec<&OscMessage> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages<'a>(&'a self, out: &mut Vec<&'a OscMessage>) {
        match self {
            Self::Message(msg) => out.push(msg),
            Self::Bundle(bundle) => {
                for packet in &bundle.content {
                    packet.collect_messages(out);
                }
            }
        }
    }
}

/// Decode one datagram into an OSC packet
pub fn decode_packet(data: &[u8]) -> Result<OscPacket, OscError> {
    decode_packet_at_depth(data, 0)
}

fn decode_packet_at_depth(data: &[u8], depth: usize) -> Result<OscPacket, OscError> {
    if data.starts_with(BUNDLE_TAG) {
        if depth >= MAX_BUNDLE_DEPTH {
            return Err(OscError::BundleTooDeep);
        }
        decode_bundle(data, depth).map(OscPacket::Bundle)
    } else {
        decode_message(data).map(OscPacket::Message)
    }
}

fn decode_bundle(data: &[u8], depth: usize) -> Result<OscBundle, OscError> {
    let mut reader = Reader::new(data);
    reader.take(BUNDLE_TAG.len())?;
    let timetag = reader.read_u64()?;

    let mut content = Vec::new();
    while !reader.is_empty() {
        let size = reader.read_i32()?;
        if size <= 0 || size % 4 != 0 {
            return Err(OscError::InvalidElementSize(size));
        }
        let element = reader.take(size as usize)?;
        content.push(decode_packet_at_depth(element, depth + 1)?);
    }

    Ok(OscBundle { timetag, content })
}

fn decode_message(data: &[u8]) -> Result<OscMessage, OscError> {
    let mut reader = Reader::new(data);

    let address = reader.read_string()?;
    if !address.starts_with('/') {
        return Err(OscError::InvalidAddress(address));
    }

    // Type tags may be omitted entirely by old senders (no arguments)
    if reader.is_empty() {
        return Ok(OscMessage::new(address, Vec::new()));
    }

    let tags = reader.read_string()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(OscError::MissingTypeTags);
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => OscArg::Int(reader.read_i32()?),
            'f' => OscArg::Float(f32::from_bits(reader.read_u32()?)),
            's' | 'S' => OscArg::String(reader.read_string()?),
            'b' => OscArg::Blob(reader.read_blob()?),
            'h' => OscArg::Long(reader.read_u64()? as i64),
            't' => OscArg::Time(reader.read_u64()?),
            'd' => OscArg::Double(f64::from_bits(reader.read_u64()?)),
            'c' => {
                let code = reader.read_u32()?;
                OscArg::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            'N' => OscArg::Nil,
            'I' => OscArg::Inf,
            other => return Err(OscError::UnknownTypeTag(other)),
        };
        args.push(arg);
    }

    if !reader.is_empty() {
        return Err(OscError::TrailingBytes(reader.remaining()));
    }

    Ok(OscMessage::new(address, args))
}

/// Encode a packet into datagram bytes
pub fn encode_packet(packet: &OscPacket) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_packet(packet, &mut out);
    out
}

/// Encode a single message into datagram bytes
pub fn encode_message(msg: &OscMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_message(msg, &mut out);
    out
}

fn write_packet(packet: &OscPacket, out: &mut Vec<u8>) {
    match packet {
        OscPacket::Message(msg) => write_message(msg, out),
        OscPacket::Bundle(bundle) => {
            out.extend_from_slice(BUNDLE_TAG);
            out.extend_from_slice(&bundle.timetag.to_be_bytes());
            for element in &bundle.content {
                let mut element_bytes = Vec::new();
                write_packet(element, &mut element_bytes);
                out.extend_from_slice(&(element_bytes.len() as i32).to_be_bytes());
                out.extend_from_slice(&element_bytes);
            }
        }
    }
}

fn write_message(msg: &OscMessage, out: &mut Vec<u8>) {
    write_string(&msg.address, out);

    let mut tags = String::with_capacity(msg.args.len() + 1);
    tags.push(',');
    tags.extend(msg.args.iter().map(OscArg::tag));
    write_string(&tags, out);

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            OscArg::String(s) => write_string(s, out),
            OscArg::Blob(bytes) => {
                out.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                out.extend_from_slice(bytes);
                pad(out);
            }
            OscArg::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Time(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            OscArg::Char(c) => out.extend_from_slice(&(*c as u32).to_be_bytes()),
            OscArg::Bool(_) | OscArg::Nil | OscArg::Inf => {}
        }
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    pad(out);
}

fn pad(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Round up to the next multiple of 4
#[inline]
fn padded(len: usize) -> usize {
    (len + 3) & !3
}

/// Bounds-checked big-endian cursor over a datagram
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], OscError> {
        if self.remaining() < len {
            return Err(OscError::Truncated {
                offset: self.pos,
                needed: len,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, OscError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, OscError> {
        self.read_u32().map(|v| v as i32)
    }

    fn read_u64(&mut self) -> Result<u64, OscError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, OscError> {
        let start = self.pos;
        let rest = &self.data[start..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(OscError::UnterminatedString(start))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| OscError::InvalidUtf8(start))?
            .to_string();
        // Terminator plus padding; the padding itself may run past a short packet
        self.take(padded(nul + 1))?;
        Ok(text)
    }

    fn read_blob(&mut self) -> Result<Vec<u8>, OscError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(OscError::InvalidElementSize(len));
        }
        let len = len as usize;
        let bytes = self.take(len)?.to_vec();
        self.take(padded(len) - len)?;
        Ok(bytes)
    }
}
