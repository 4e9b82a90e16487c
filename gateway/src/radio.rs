//! # radio
//!
//! Framed-byte radio access behind the [`RadioLink`] trait. The real LoRa
//! concentrator hands the bridge whole frames and takes whole frames back;
//! everything below that (PHY, modem modes) lives in the driver process.
//!
//! [`UdpRadio`] is the development link: one datagram = one frame. It answers
//! toward a fixed peer when configured, otherwise toward whoever sent the
//! last frame, which is enough for a bench setup with one modem.

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::info;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("radio I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("no peer to transmit to yet")]
    NoPeer,
}

#[async_trait]
pub trait RadioLink: Send + Sync + 'static {
    /// Next inbound frame, preamble included.
    async fn recv_frame(&self) -> Result<Vec<u8>, RadioError>;
    /// Transmit one frame, preamble included.
    async fn send_frame(&self, frame: &[u8]) -> Result<(), RadioError>;
}

pub struct UdpRadio {
    socket: UdpSocket,
    target: Option<SocketAddr>,
    last_peer: Mutex<Option<SocketAddr>>,
}

impl UdpRadio {
    pub async fn bind(addr: &str, target: Option<SocketAddr>) -> Result<Self, RadioError> {
        let socket = UdpSocket::bind(addr).await?;
        info!("radio link on UDP {}", socket.local_addr()?);
        Ok(Self { socket, target, last_peer: Mutex::new(None) })
    }
}

#[async_trait]
impl RadioLink for UdpRadio {
    async fn recv_frame(&self) -> Result<Vec<u8>, RadioError> {
        let mut buf = vec![0u8; 512];
        let (len, src) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        *self.last_peer.lock().unwrap() = Some(src);
        Ok(buf)
    }

    async fn send_frame(&self, frame: &[u8]) -> Result<(), RadioError> {
        let dest = self
            .target
            .or_else(|| *self.last_peer.lock().unwrap())
            .ok_or(RadioError::NoPeer)?;
        self.socket.send_to(frame, dest).await?;
        Ok(())
    }
}
