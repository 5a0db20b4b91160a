use crate::core::value::Value;
use bytes::Bytes;
use std::fmt;

/// Protocol packet kinds, tagged with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    Error,
    BinaryEvent,
    BinaryAck,
    /// Any code this core does not route directly (raw attachment frames).
    Other(u8),
}

impl PacketKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => PacketKind::Connect,
            1 => PacketKind::Disconnect,
            2 => PacketKind::Event,
            3 => PacketKind::Ack,
            4 => PacketKind::Error,
            5 => PacketKind::BinaryEvent,
            6 => PacketKind::BinaryAck,
            other => PacketKind::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PacketKind::Connect => 0,
            PacketKind::Disconnect => 1,
            PacketKind::Event => 2,
            PacketKind::Ack => 3,
            PacketKind::Error => 4,
            PacketKind::BinaryEvent => 5,
            PacketKind::BinaryAck => 6,
            PacketKind::Other(code) => code,
        }
    }

    /// BINARY_EVENT and BINARY_ACK carry placeholders awaiting attachments.
    #[inline]
    pub fn is_binary(self) -> bool {
        matches!(self, PacketKind::BinaryEvent | PacketKind::BinaryAck)
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Connect => "CONNECT",
            PacketKind::Disconnect => "DISCONNECT",
            PacketKind::Event => "EVENT",
            PacketKind::Ack => "ACK",
            PacketKind::Error => "ERROR",
            PacketKind::BinaryEvent => "BINARY_EVENT",
            PacketKind::BinaryAck => "BINARY_ACK",
            PacketKind::Other(_) => "OTHER",
        }
    }
}

/// One decoded protocol frame.
///
/// `id` is the correlation identifier; `None` means no acknowledgement is
/// expected. `attachment_count` is the number of binary attachments a
/// BINARY_EVENT/BINARY_ACK declares; `attachments` holds raw buffers, either
/// the single buffer of an attachment frame or nothing once reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketKind,
    pub id: Option<u64>,
    pub payload: Option<Value>,
    pub attachment_count: usize,
    pub attachments: Vec<Bytes>,
}

impl Packet {
    pub fn new(kind: PacketKind) -> Self {
        Self {
            kind,
            id: None,
            payload: None,
            attachment_count: 0,
            attachments: Vec::new(),
        }
    }

    pub fn connect() -> Self {
        Self::new(PacketKind::Connect)
    }

    pub fn disconnect() -> Self {
        Self::new(PacketKind::Disconnect)
    }

    /// EVENT packet whose payload is `[name, args...]`.
    pub fn event(name: impl Into<Value>, args: Vec<Value>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(name.into());
        items.extend(args);
        Self::new(PacketKind::Event).with_payload(Value::Array(items))
    }

    /// ACK packet whose payload is the raw reply array.
    pub fn ack(id: u64, args: Vec<Value>) -> Self {
        Self::new(PacketKind::Ack)
            .with_id(id)
            .with_payload(Value::Array(args))
    }

    pub fn error(payload: Option<Value>) -> Self {
        Self {
            payload,
            ..Self::new(PacketKind::Error)
        }
    }

    /// BINARY_EVENT with a payload skeleton containing `attachment_count` placeholders.
    pub fn binary_event(payload: Value, attachment_count: usize) -> Self {
        Self {
            attachment_count,
            ..Self::new(PacketKind::BinaryEvent).with_payload(payload)
        }
    }

    /// BINARY_ACK with a payload skeleton containing `attachment_count` placeholders.
    pub fn binary_ack(id: u64, payload: Value, attachment_count: usize) -> Self {
        Self {
            attachment_count,
            ..Self::new(PacketKind::BinaryAck)
                .with_id(id)
                .with_payload(payload)
        }
    }

    /// A raw attachment frame. Deliver with `is_binary = true`.
    pub fn attachment(data: impl Into<Bytes>) -> Self {
        Self {
            attachments: vec![data.into()],
            ..Self::new(PacketKind::Other(u8::MAX))
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the correlation id from a signed wire value; negatives mean none.
    pub fn with_raw_id(mut self, id: i64) -> Self {
        self.id = u64::try_from(id).ok();
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Payload elements, if the payload is an array.
    pub fn payload_items(&self) -> Option<&[Value]> {
        self.payload.as_ref().and_then(Value::as_array)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if let Some(id) = self.id {
            write!(f, " id={id}")?;
        }
        if self.attachment_count > 0 {
            write!(f, " attachments={}", self.attachment_count)?;
        }
        if !self.attachments.is_empty() {
            let total: usize = self.attachments.iter().map(Bytes::len).sum();
            write!(f, " raw={}B", total)?;
        }
        if let Some(payload) = &self.payload {
            write!(f, " {}", payload.to_json())?;
        }
        Ok(())
    }
}
