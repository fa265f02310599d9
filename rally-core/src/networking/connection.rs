use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::marker::PhantomData;
use std::net::TcpStream;

use tracing::{trace, warn};

use super::{NetError, Packet, Transport};

// Every well-formed frame starts with two big-endian bytes holding the size of
// the bincode payload that follows
const FRAME_HEADER_LEN: usize = 2;
const READ_CHUNK_LEN: usize = 4096;

pub struct Connection<T: Packet, V: Packet> {
    tcp_stream: TcpStream,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    incoming_packets: VecDeque<T>,
    closed: bool,
    _outgoing: PhantomData<V>,
}

impl<T: Packet, V: Packet> Connection<T, V> {
    pub fn new(tcp_stream: TcpStream) -> Result<Connection<T, V>, NetError> {
        // disable the Nagle algorithm to allow for real-time transfers
        tcp_stream.set_nodelay(true)?;
        // the owning loop polls us every tick, so never block it
        tcp_stream.set_nonblocking(true)?;
        Ok(Connection {
            tcp_stream,
            read_buffer: Vec::new(),
            write_buffer: Vec::new(),
            incoming_packets: VecDeque::new(),
            closed: false,
            _outgoing: PhantomData,
        })
    }

    fn read_available(&mut self) -> Result<(), NetError> {
        let mut chunk = [0u8; READ_CHUNK_LEN];
        loop {
            match self.tcp_stream.read(&mut chunk) {
                // a zero-length read means the other side hung up
                Ok(0) => {
                    self.closed = true;
                    return Err(NetError::Closed);
                }
                Ok(n) => self.read_buffer.extend_from_slice(&chunk[..n]),
                // no more data on this connection for now
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.closed = true;
                    return Err(e.into());
                }
            }
        }
    }

    fn parse_frames(&mut self) {
        loop {
            if self.read_buffer.len() < FRAME_HEADER_LEN {
                break;
            }
            let packet_size =
                ((self.read_buffer[0] as usize) << 8) | self.read_buffer[1] as usize;
            if self.read_buffer.len() < FRAME_HEADER_LEN + packet_size {
                // rest of this frame hasn't arrived yet
                break;
            }

            let frame: Vec<u8> = self
                .read_buffer
                .drain(..FRAME_HEADER_LEN + packet_size)
                .collect();
            match T::parse_packet_bytes(&frame[FRAME_HEADER_LEN..]) {
                Ok(packet) => self.incoming_packets.push_back(packet),
                // a garbled frame only costs us that one message
                Err(err) => warn!(%err, packet_size, "dropping malformed packet"),
            }
        }
    }

    fn flush_write_buffer(&mut self) -> Result<(), NetError> {
        while !self.write_buffer.is_empty() {
            match self.tcp_stream.write(&self.write_buffer) {
                Ok(0) => {
                    self.closed = true;
                    return Err(NetError::Closed);
                }
                Ok(n) => {
                    self.write_buffer.drain(..n);
                }
                // socket buffer is full; keep the rest for next tick
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.closed = true;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

impl<T: Packet, V: Packet> Transport<T, V> for Connection<T, V> {
    // fetch packets for this connection until exhausted
    fn fetch_incoming_packets(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::Closed);
        }
        let result = self.read_available();
        // whatever arrived before a hang-up is still worth handling
        self.parse_frames();
        result
    }

    fn pop_incoming(&mut self) -> Option<T> {
        self.incoming_packets.pop_front()
    }

    fn push_outgoing(&mut self, packet: V) {
        let size = match packet.packet_size() {
            Ok(size) => size,
            Err(err) => {
                warn!(%err, "could not size outgoing packet");
                return;
            }
        };
        if size > u16::MAX as u64 {
            warn!(err = %NetError::PacketTooLarge(size), "dropping outgoing packet");
            return;
        }

        self.write_buffer.extend_from_slice(&[(size >> 8) as u8, size as u8]);
        if let Err(err) = packet.write_packet(&mut self.write_buffer) {
            warn!(%err, "could not encode outgoing packet");
            // roll back the header we just wrote
            let new_len = self.write_buffer.len() - FRAME_HEADER_LEN;
            self.write_buffer.truncate(new_len);
            return;
        }
        trace!(size, "queued packet");
    }

    // send queued packets on this connection until exhausted (or the socket fills up)
    fn sync_outgoing(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::Closed);
        }
        self.flush_write_buffer()
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use glam::DVec3;

    use crate::networking::{ClientBoundPacket, ClientConnection, ServerBoundPacket, ServerConnection};
    use crate::transform::Transform;

    use super::*;

    fn connected_pair() -> (ClientConnection, ServerConnection) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client_stream = TcpStream::connect(addr).unwrap();
        let (server_stream, _) = listener.accept().unwrap();
        (
            ClientConnection::new(server_stream).unwrap(),
            ServerConnection::new(client_stream).unwrap(),
        )
    }

    fn wait_for<T: Packet, V: Packet>(connection: &mut Connection<T, V>) -> Option<T> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            let _ = connection.fetch_incoming_packets();
            if let Some(packet) = connection.pop_incoming() {
                return Some(packet);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn packets_arrive_in_send_order() {
        let (mut relay_side, mut participant_side) = connected_pair();

        participant_side.push_outgoing(ServerBoundPacket::HornSound);
        participant_side.push_outgoing(ServerBoundPacket::Movement(Transform::new(
            DVec3::new(1.0, 2.0, 3.0),
            0.5,
        )));
        participant_side.sync_outgoing().unwrap();

        assert_eq!(wait_for(&mut relay_side), Some(ServerBoundPacket::HornSound));
        assert_eq!(
            wait_for(&mut relay_side),
            Some(ServerBoundPacket::Movement(Transform::new(
                DVec3::new(1.0, 2.0, 3.0),
                0.5
            )))
        );

        relay_side.push_outgoing(ClientBoundPacket::ParticipantLeft(9));
        relay_side.sync_outgoing().unwrap();
        assert_eq!(
            wait_for(&mut participant_side),
            Some(ClientBoundPacket::ParticipantLeft(9))
        );
    }

    #[test]
    fn hang_up_marks_connection_closed() {
        let (mut relay_side, participant_side) = connected_pair();
        drop(participant_side);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !relay_side.is_closed() && Instant::now() < deadline {
            let _ = relay_side.fetch_incoming_packets();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(relay_side.is_closed());
    }
}
