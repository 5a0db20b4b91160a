use crate::core::packet::{Packet, PacketKind};

/// Where an incoming packet goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Fire the synthetic "connection" event.
    Connect,
    /// Tear down the connection.
    Disconnect,
    /// Split the payload into name and arguments and call listeners.
    Event,
    /// Surface the reply array to the ack resolver.
    Ack,
    /// Fire the synthetic "error" event with the payload's text.
    Error,
    /// Start reconstructing a BINARY_EVENT/BINARY_ACK.
    BeginBinary,
    /// Feed a raw attachment to the reconstructor.
    Attachment,
    /// Nothing to do.
    Ignore,
}

/// Map a decoded packet to its handler. Stateless; a binary flag on a packet
/// of an unrouted kind marks it as a raw attachment frame.
#[inline]
pub fn route(packet: &Packet, is_binary: bool) -> Route {
    match packet.kind {
        PacketKind::Connect => Route::Connect,
        PacketKind::Disconnect => Route::Disconnect,
        PacketKind::Event => Route::Event,
        PacketKind::Ack => Route::Ack,
        PacketKind::Error => Route::Error,
        PacketKind::BinaryEvent | PacketKind::BinaryAck => Route::BeginBinary,
        PacketKind::Other(_) if is_binary => Route::Attachment,
        PacketKind::Other(_) => Route::Ignore,
    }
}

/// Route a freshly reconstructed binary packet. A correlation id marks it as
/// an ACK reply; otherwise it is an event.
#[inline]
pub fn route_reconstructed(packet: &Packet) -> Route {
    if packet.id.is_some() {
        Route::Ack
    } else {
        Route::Event
    }
}
