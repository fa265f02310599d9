mod connection;
mod error;
mod packets;
pub mod ws;

pub use connection::Connection;
pub use error::NetError;
pub use packets::*;

pub type ClientConnection = connection::Connection<ServerBoundPacket, ClientBoundPacket>;
pub type ServerConnection = connection::Connection<ClientBoundPacket, ServerBoundPacket>;
pub type WebSocketConnection = ws::WSConnection<ServerBoundPacket, ClientBoundPacket>;
pub type PendingWebSocketConnection = ws::PendingWSConnection<ServerBoundPacket, ClientBoundPacket>;
pub type WebSocketHandshake = ws::Handshake<ServerBoundPacket, ClientBoundPacket>;

// One bidirectional event channel per participant. `T` is what we receive,
// `V` is what we send. Nothing here blocks: callers poll once per tick.
pub trait Transport<T, V> {
    fn fetch_incoming_packets(&mut self) -> Result<(), NetError>;
    fn pop_incoming(&mut self) -> Option<T>;
    fn push_outgoing(&mut self, packet: V);
    fn sync_outgoing(&mut self) -> Result<(), NetError>;
    fn is_closed(&self) -> bool;
}
