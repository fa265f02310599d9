use std::collections::VecDeque;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::net::TcpStream;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use tungstenite::handshake::server::{NoCallback, ServerHandshake};
use tungstenite::handshake::MidHandshake;
pub use tungstenite::{accept, HandshakeError, Message, WebSocket};

use super::{NetError, Transport};

// Browser participants speak JSON over websocket text frames instead of the
// bincode framing used by native clients; the relay can't tell the difference
pub struct WSConnection<T: DeserializeOwned, V: Serialize> {
    socket: WebSocket<TcpStream>,
    incoming_packets: VecDeque<T>,
    closed: bool,
    _outgoing: PhantomData<V>,
}

type ServerHandshakeResult =
    Result<WebSocket<TcpStream>, HandshakeError<ServerHandshake<TcpStream, NoCallback>>>;

/// Where an incoming websocket upgrade stands after the bytes read so far.
pub enum Handshake<T: DeserializeOwned, V: Serialize> {
    Complete(WSConnection<T, V>),
    // the peer hasn't sent (or we haven't answered) the whole upgrade yet
    Pending(PendingWSConnection<T, V>),
}

// An upgrade that stopped on WouldBlock. Resumed once per tick by the owner,
// never waited on.
pub struct PendingWSConnection<T: DeserializeOwned, V: Serialize> {
    handshake: MidHandshake<ServerHandshake<TcpStream, NoCallback>>,
    _packets: PhantomData<(T, V)>,
}

impl<T: DeserializeOwned, V: Serialize> PendingWSConnection<T, V> {
    pub fn resume(self) -> Result<Handshake<T, V>, NetError> {
        WSConnection::advance(self.handshake.handshake())
    }
}

impl<T: DeserializeOwned, V: Serialize> WSConnection<T, V> {
    /// Starts the upgrade on a freshly accepted socket without ever blocking.
    pub fn start(tcp_stream: TcpStream) -> Result<Handshake<T, V>, NetError> {
        tcp_stream.set_nonblocking(true)?;
        tcp_stream.set_nodelay(true)?;
        WSConnection::advance(accept(tcp_stream))
    }

    fn advance(result: ServerHandshakeResult) -> Result<Handshake<T, V>, NetError> {
        match result {
            Ok(socket) => Ok(Handshake::Complete(WSConnection {
                socket,
                incoming_packets: VecDeque::new(),
                closed: false,
                _outgoing: PhantomData,
            })),
            Err(HandshakeError::Interrupted(handshake)) => {
                Ok(Handshake::Pending(PendingWSConnection {
                    handshake,
                    _packets: PhantomData,
                }))
            }
            Err(HandshakeError::Failure(err)) => Err(NetError::Handshake(err.to_string())),
        }
    }

    fn handle_socket_error(&mut self, err: tungstenite::Error) -> Result<(), NetError> {
        match err {
            tungstenite::Error::Io(ref e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                self.closed = true;
                Err(NetError::Closed)
            }
            other => {
                self.closed = true;
                Err(other.into())
            }
        }
    }
}

impl<T: DeserializeOwned, V: Serialize> Transport<T, V> for WSConnection<T, V> {
    fn fetch_incoming_packets(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::Closed);
        }
        loop {
            match self.socket.read_message() {
                Ok(Message::Text(txt)) => match serde_json::from_str::<T>(&txt) {
                    Ok(packet) => self.incoming_packets.push_back(packet),
                    Err(err) => warn!(%err, "dropping malformed websocket message"),
                },
                Ok(Message::Close(_)) => {
                    self.closed = true;
                    return Err(NetError::Closed);
                }
                // pings are answered by tungstenite itself; binary frames aren't part of the protocol
                Ok(other) => debug!(len = other.len(), "ignoring non-text websocket frame"),
                Err(err) => return self.handle_socket_error(err),
            }
        }
    }

    fn pop_incoming(&mut self) -> Option<T> {
        self.incoming_packets.pop_front()
    }

    fn push_outgoing(&mut self, packet: V) {
        let json_string = match serde_json::to_string(&packet) {
            Ok(json_string) => json_string,
            Err(err) => {
                warn!(%err, "could not serialize outgoing websocket message");
                return;
            }
        };
        // on a non-blocking socket a WouldBlock here still queues the frame
        if let Err(err) = self.socket.write_message(Message::Text(json_string)) {
            let _ = self.handle_socket_error(err);
        }
    }

    // send queued frames on this connection until exhausted
    fn sync_outgoing(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::Closed);
        }
        match self.socket.write_pending() {
            Ok(()) => Ok(()),
            Err(err) => self.handle_socket_error(err),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
