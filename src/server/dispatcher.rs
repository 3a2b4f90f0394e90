//! Routing of DIMSE requests to service class providers

use std::collections::HashMap;
use std::time::Duration;

use dimse::{Association, DimseCommand, Request};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};
use crate::server::scp;

/// The service class providers the archive implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scp {
    Echo,
    Find,
    Get,
    Move,
    Store,
}

impl Scp {
    /// Provider answering `command`
    pub fn for_command(command: DimseCommand) -> Self {
        match command {
            DimseCommand::Echo => Scp::Echo,
            DimseCommand::Find => Scp::Find,
            DimseCommand::Get => Scp::Get,
            DimseCommand::Move => Scp::Move,
            DimseCommand::Store => Scp::Store,
        }
    }
}

/// What a provider needs besides the request and the association
#[derive(Debug, Clone)]
pub struct Session {
    pub archive: Archive,
    pub principal: String,
    /// Connection timeout of C-MOVE sub-associations
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    providers: HashMap<DimseCommand, Scp>,
}

impl Dispatcher {
    /// A dispatcher with no provider
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher answering every command
    pub fn with_all_services() -> Self {
        DimseCommand::ALL
            .into_iter()
            .fold(Self::new(), |dispatcher, command| {
                dispatcher.with_scp(command, Scp::for_command(command))
            })
    }

    pub fn with_scp(mut self, command: DimseCommand, scp: Scp) -> Self {
        self.providers.insert(command, scp);
        self
    }

    pub fn has_scp(&self, command: DimseCommand) -> bool {
        self.providers.contains_key(&command)
    }

    pub fn get_scp(&self, command: DimseCommand) -> Result<Scp> {
        self.providers
            .get(&command)
            .copied()
            .ok_or_else(|| ArchiveError::NotSupported(format!("No SCP for {}", command)))
    }

    /// Route one request to its provider
    pub async fn dispatch<S>(
        &self,
        session: &Session,
        association: &mut Association<S>,
        request: Request,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        tracing::debug!("📨 {} request {}", request.command, request.message_id);
        match self.get_scp(request.command)? {
            Scp::Echo => scp::echo(session, association, request).await,
            Scp::Find => scp::find(session, association, request).await,
            Scp::Get => scp::get(session, association, request).await,
            Scp::Move => scp::move_(session, association, request).await,
            Scp::Store => scp::store(session, association, request).await,
        }
    }
}
