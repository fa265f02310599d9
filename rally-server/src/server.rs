use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::mem;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use rally_core::networking::{
    ClientBoundPacket, ClientConnection, NetError, PendingWebSocketConnection,
    ServerBoundPacket, Transport, WebSocketConnection, WebSocketHandshake,
};
use rally_core::world::WorldDefinition;
use rally_core::{ParticipantID, Settings};
use tracing::{debug, info, warn};

use crate::relay::{Delivery, Relay};

type ParticipantTransport = Box<dyn Transport<ServerBoundPacket, ClientBoundPacket>>;

// upgrades that haven't finished by then are dropped
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

struct PendingUpgrade {
    addr: SocketAddr,
    since: Instant,
    connection: PendingWebSocketConnection,
}

pub struct RelayServer {
    listener: TcpListener,
    ws_listener: TcpListener,
    pending_upgrades: Vec<PendingUpgrade>,
    connections: BTreeMap<ParticipantID, ParticipantTransport>,
    relay: Relay,
    tick: Duration,
}

impl RelayServer {
    pub fn new(settings: &Settings, world: &WorldDefinition) -> Result<RelayServer, NetError> {
        // start the TCP listening services; both are polled from the main loop
        let ip_addr = format!("0.0.0.0:{}", settings.port);
        let listener = TcpListener::bind(&ip_addr)?;
        listener.set_nonblocking(true)?;
        info!(%ip_addr, "relay now listening");

        let ws_addr = format!("0.0.0.0:{}", settings.ws_port);
        let ws_listener = TcpListener::bind(&ws_addr)?;
        ws_listener.set_nonblocking(true)?;
        info!(%ws_addr, "relay now listening for websocket participants");

        Ok(RelayServer {
            listener,
            ws_listener,
            pending_upgrades: Vec::new(),
            connections: BTreeMap::new(),
            relay: Relay::new(world, Instant::now()),
            tick: settings.server_tick(),
        })
    }

    // WARNING: this function never returns
    pub fn start_loop(&mut self) -> ! {
        loop {
            let start_time = Instant::now();
            self.run_tick(start_time);

            // wait until server tick time has elapsed
            match self.tick.checked_sub(start_time.elapsed()) {
                Some(remaining_tick_duration) => thread::sleep(remaining_tick_duration),
                None => warn!(
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "relay tick took longer than configured length"
                ),
            }
        }
    }

    // One iteration of work: accept, read, relay, reap, send. Every message
    // is handled to completion before the next one is looked at.
    pub fn run_tick(&mut self, now: Instant) {
        self.acquire_new_connections(now);
        self.continue_upgrades(now);

        // poll for input events and add them to each connection's incoming queue
        for (id, connection) in self.connections.iter_mut() {
            if let Err(err) = connection.fetch_incoming_packets() {
                if !matches!(err, NetError::Closed) {
                    warn!(id, %err, "dropping connection after read error");
                }
            }
        }

        self.process_incoming_packets(now);
        self.reap_closed_connections();
        self.relay.tick(now);

        // empty outgoing packet queues and send to participants
        for (id, connection) in self.connections.iter_mut() {
            if let Err(err) = connection.sync_outgoing() {
                debug!(id, %err, "could not flush connection");
            }
        }
    }

    fn acquire_new_connections(&mut self, now: Instant) {
        loop {
            match self.listener.accept() {
                Ok((socket, addr)) => match ClientConnection::new(socket) {
                    Ok(connection) => {
                        let id = self.relay.connect();
                        info!(id, %addr, "new connection");
                        self.connections.insert(id, Box::new(connection));
                    }
                    Err(err) => warn!(%addr, %err, "could not set up connection"),
                },
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(err = %e, "couldn't get connecting participant info");
                    break;
                }
            }
        }

        loop {
            match self.ws_listener.accept() {
                Ok((socket, addr)) => self.upgrade(addr, now, WebSocketConnection::start(socket)),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(err = %e, "couldn't get connecting websocket info");
                    break;
                }
            }
        }
    }

    // Websocket peers only become participants once their upgrade is done; a
    // slow or silent peer just stays pending
    fn continue_upgrades(&mut self, now: Instant) {
        for pending in mem::take(&mut self.pending_upgrades) {
            if now.saturating_duration_since(pending.since) >= HANDSHAKE_TIMEOUT {
                warn!(addr = %pending.addr, "websocket handshake timed out");
                continue;
            }
            self.upgrade(pending.addr, pending.since, pending.connection.resume());
        }
    }

    fn upgrade(
        &mut self,
        addr: SocketAddr,
        since: Instant,
        progress: Result<WebSocketHandshake, NetError>,
    ) {
        match progress {
            Ok(WebSocketHandshake::Complete(connection)) => {
                let id = self.relay.connect();
                info!(id, %addr, "new websocket connection");
                self.connections.insert(id, Box::new(connection));
            }
            Ok(WebSocketHandshake::Pending(connection)) => {
                self.pending_upgrades.push(PendingUpgrade {
                    addr,
                    since,
                    connection,
                });
            }
            Err(err) => warn!(%addr, %err, "websocket handshake failed"),
        }
    }

    // handle every packet in received order, one connection at a time
    fn process_incoming_packets(&mut self, now: Instant) {
        let ids: Vec<ParticipantID> = self.connections.keys().copied().collect();
        for id in ids {
            while let Some(packet) = self
                .connections
                .get_mut(&id)
                .and_then(|connection| connection.pop_incoming())
            {
                let deliveries = self.relay.handle_packet(id, packet, now);
                self.deliver(deliveries);
            }
        }
    }

    fn reap_closed_connections(&mut self) {
        let closed: Vec<ParticipantID> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_closed())
            .map(|(id, _)| *id)
            .collect();

        for id in closed {
            self.connections.remove(&id);
            debug!(id, "connection closed");
            let deliveries = self.relay.disconnect(id);
            self.deliver(deliveries);
        }
    }

    fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for (recipient, packet) in deliveries {
            // the recipient may have hung up earlier this tick
            if let Some(connection) = self.connections.get_mut(&recipient) {
                connection.push_outgoing(packet);
            }
        }
    }

    pub fn participant_count(&self) -> usize {
        self.relay.registry().len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn pending_upgrade_count(&self) -> usize {
        self.pending_upgrades.len()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub fn ws_local_addr(&self) -> Option<SocketAddr> {
        self.ws_listener.local_addr().ok()
    }
}
