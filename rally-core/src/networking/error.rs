use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode or decode packet: {0}")]
    Codec(#[from] bincode::Error),

    #[error("could not encode or decode json message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    #[error("packet of {0} bytes does not fit in a frame")]
    PacketTooLarge(u64),

    #[error("connection closed")]
    Closed,
}
