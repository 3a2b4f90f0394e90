//! The archive's association server
//!
//! Associations are served one at a time: accept, authenticate, then answer
//! requests until the peer releases or aborts. A [`CancellationToken`]
//! interrupts a blocked accept or receive.

use std::net::SocketAddr;
use std::sync::Arc;

use dimse::uids::ARCHIVE_SHUTDOWN;
use dimse::{
    Association, AssociationListener, AssociationParameters, DimseConfig, DimseError, Message,
    PresentationContextResult,
};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::archive::Archive;
use crate::authentication::Authenticator;
use crate::error::Result;

pub mod dispatcher;
pub mod scp;

pub use dispatcher::{Dispatcher, Scp, Session};

pub struct Server {
    listener: AssociationListener,
    config: DimseConfig,
    archive: Archive,
    authenticator: Arc<dyn Authenticator>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind the listener described by `config`
    pub async fn bind(
        config: DimseConfig,
        archive: Archive,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        config.validate()?;
        let listener = AssociationListener::bind(config.socket_addr())
            .await?
            .with_request_timeout(config.association_timeout());
        Ok(Self {
            listener,
            config,
            archive,
            authenticator,
            dispatcher: Dispatcher::with_all_services(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Token cancelling `run`, for use from another task
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the server; `run` returns once the current operation is interrupted
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Accept and serve associations until shut down
    pub async fn run(&self) -> Result<()> {
        tracing::info!(
            "🚀 {} accepting associations on {}",
            self.config.local_aet,
            self.local_addr()?
        );

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept(|proposed| self.negotiate(proposed)) => accepted,
            };

            let association = match accepted {
                Ok(association) => association,
                Err(DimseError::AssociationRejected(reason)) => {
                    tracing::warn!("Association rejected: {}", reason);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Association not established: {}", e);
                    continue;
                }
            };

            if association
                .parameters()
                .accepted_context(ARCHIVE_SHUTDOWN)
                .is_some()
            {
                tracing::info!(
                    "Shutdown requested by {}",
                    association.parameters().calling_ae_title
                );
                break;
            }

            self.serve(association).await;
        }

        tracing::info!("🛑 Server stopped");
        Ok(())
    }

    /// Acceptor: authenticate, then accept every context with its first transfer syntax
    fn negotiate(&self, proposed: &AssociationParameters) -> dimse::Result<AssociationParameters> {
        if !self.authenticator.authenticate(proposed) {
            return Err(DimseError::AssociationRejected("Invalid credentials".into()));
        }

        let mut negotiated = proposed.clone();
        for context in &mut negotiated.presentation_contexts {
            context.transfer_syntaxes.truncate(1);
            let result = if context.abstract_syntax == ARCHIVE_SHUTDOWN
                && !self.config.allow_remote_shutdown
            {
                PresentationContextResult::AbstractSyntaxNotSupported
            } else if context.transfer_syntaxes.is_empty() {
                PresentationContextResult::TransferSyntaxesNotSupported
            } else {
                PresentationContextResult::Acceptance
            };
            context.result = Some(result);
        }
        Ok(negotiated)
    }

    async fn serve(&self, mut association: Association<TcpStream>) {
        let parameters = association.parameters();
        let session = Session {
            archive: self.archive.clone(),
            principal: self.authenticator.principal(parameters),
            connect_timeout: self.config.connect_timeout(),
        };
        tracing::info!(
            "🤝 Association from {} ({}), principal \"{}\"",
            parameters.calling_ae_title,
            association
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "unknown".into()),
            session.principal
        );

        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    association.abort().await;
                    return;
                }
                received = association.receive_message() => received,
            };

            let request = match received {
                Ok(Message::Request(request)) => request,
                Ok(Message::Response(response)) => {
                    tracing::warn!(
                        "Ignoring unsolicited {} response",
                        response.command
                    );
                    continue;
                }
                Err(e) if e.is_association_end() => {
                    tracing::info!("{}", e);
                    return;
                }
                Err(e) => {
                    tracing::error!("Association failed: {}", e);
                    return;
                }
            };

            if let Err(e) = self
                .dispatcher
                .dispatch(&session, &mut association, request)
                .await
            {
                match e {
                    crate::error::ArchiveError::Dimse(ref inner) if inner.is_association_end() => {
                        tracing::info!("{}", inner);
                    }
                    _ => {
                        tracing::error!("Dispatch failed: {}", e);
                        association.abort().await;
                    }
                }
                return;
            }
        }
    }
}
