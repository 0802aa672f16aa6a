//! Bounded TCP listener for ICAP clients.
//!
//! # Responsibilities
//! - Bind the ICAP port
//! - Hand out at most `max_connections` live connections at a time
//!
//! A proxy holding every slot simply waits in the kernel backlog until one
//! of its connections closes.

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("invalid bind address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: AddrParseError,
    },
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
    /// The slot semaphore was closed; no further connections can be admitted.
    #[error("connection slots closed")]
    Closed,
}

/// ICAP listening socket with a fixed number of connection slots.
pub struct Listener {
    inner: TcpListener,
    slots: Arc<Semaphore>,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address: SocketAddr =
            config
                .bind_address
                .parse()
                .map_err(|source| ListenerError::InvalidAddress {
                    address: config.bind_address.clone(),
                    source,
                })?;

        let inner = TcpListener::bind(address)
            .await
            .map_err(|source| ListenerError::Bind { address, source })?;

        tracing::info!(
            address = ?inner.local_addr().ok(),
            max_connections = config.max_connections,
            "ICAP port bound"
        );

        Ok(Self {
            inner,
            slots: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    /// Wait for a free slot, then for the next client.
    ///
    /// The returned permit holds the slot until it is dropped.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        tracing::debug!(%peer, free_slots = self.slots.available_permits(), "ICAP client connected");

        Ok((stream, peer, ConnectionPermit { _slot: permit }))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// One occupied connection slot; released on drop, even if the handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _slot: OwnedSemaphorePermit,
}
