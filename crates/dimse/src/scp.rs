//! Service Class Provider side: listening for inbound associations

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::association::{Association, AssociationParameters};
use crate::{DimseError, Result};

/// TCP listener producing one [`Association`] per accepted connection
pub struct AssociationListener {
    listener: TcpListener,
    request_timeout: Duration,
}

impl AssociationListener {
    /// Bind the listener
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening for DIMSE associations on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            request_timeout: Duration::from_secs(30),
        })
    }

    /// How long a connected peer may take to send its associate request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next connection and run the acceptor on its proposal
    ///
    /// A rejected proposal is reported as `DimseError::AssociationRejected`
    /// after the reject PDU has been sent.
    pub async fn accept<F>(&self, acceptor: F) -> Result<Association<TcpStream>>
    where
        F: FnOnce(&AssociationParameters) -> Result<AssociationParameters>,
    {
        let (stream, peer_addr) = self.listener.accept().await?;
        debug!("Accepted connection from {}", peer_addr);

        tokio::time::timeout(
            self.request_timeout,
            Association::accept(stream, Some(peer_addr), acceptor),
        )
        .await
        .map_err(|_| {
            DimseError::protocol(format!(
                "no associate request from {} within {:?}",
                peer_addr, self.request_timeout
            ))
        })?
    }
}
