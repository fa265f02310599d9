use std::net::TcpStream;

use rally_core::networking::{
    ClientBoundPacket, NetError, ServerBoundPacket, ServerConnection, Transport,
};
use tracing::{debug, info};

// Our end of the channel to the relay
pub struct GameClient {
    connection: ServerConnection,
}

impl GameClient {
    pub fn connect(ip_addr: &str) -> Result<GameClient, NetError> {
        let stream = TcpStream::connect(ip_addr)?;
        info!(%ip_addr, "connected to relay");
        Ok(GameClient::new(ServerConnection::new(stream)?))
    }

    pub fn new(connection: ServerConnection) -> GameClient {
        GameClient { connection }
    }

    pub fn fetch_incoming_packets(&mut self) -> Result<(), NetError> {
        self.connection.fetch_incoming_packets()
    }

    pub fn current_packets(&mut self) -> Vec<ClientBoundPacket> {
        let mut ret = vec![];
        while let Some(packet) = self.connection.pop_incoming() {
            ret.push(packet);
        }
        ret
    }

    pub fn send(&mut self, packet: ServerBoundPacket) {
        debug!(?packet, "queueing packet");
        self.connection.push_outgoing(packet);
    }

    pub fn send_all<I: IntoIterator<Item = ServerBoundPacket>>(&mut self, packets: I) {
        for packet in packets {
            self.send(packet);
        }
    }

    pub fn sync_outgoing(&mut self) -> Result<(), NetError> {
        self.connection.sync_outgoing()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }
}
