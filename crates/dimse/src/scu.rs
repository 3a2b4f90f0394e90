//! Service Class User side: issuing requests on an association

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::association::{Association, AssociationParameters};
use crate::config::RemoteNode;
use crate::dataset::DataSet;
use crate::message::{Message, Request, Response};
use crate::types::{status, DimseCommand};
use crate::{tags, DimseError, Result};

/// Everything a C-GET brought back
#[derive(Debug, Default)]
pub struct GetOutcome {
    /// Instances received through C-STORE sub-operations
    pub received: Vec<DataSet>,
    /// C-GET responses, the final one last
    pub responses: Vec<Response>,
}

/// DIMSE Service Class User bound to one association
pub struct DimseScu<S = TcpStream> {
    association: Association<S>,
}

impl DimseScu<TcpStream> {
    /// Open an association with a remote node
    pub async fn connect(node: &RemoteNode, parameters: AssociationParameters) -> Result<Self> {
        node.validate()?;
        let timeout = Duration::from_millis(node.connect_timeout_ms.unwrap_or(30_000));
        let association = Association::connect(&node.host, node.port, parameters, timeout).await?;
        Ok(Self { association })
    }
}

impl<S> DimseScu<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(association: Association<S>) -> Self {
        Self { association }
    }

    pub fn association(&self) -> &Association<S> {
        &self.association
    }

    /// C-ECHO; returns the response status
    pub async fn echo(&mut self) -> Result<u16> {
        let id = self.association.next_message_id();
        let responses = self.exchange(Request::echo(id)).await?;
        final_status(&responses)
    }

    /// C-STORE one instance
    pub async fn store(&mut self, data_set: DataSet) -> Result<Response> {
        let sop_class = data_set
            .as_string(tags::SOP_CLASS_UID, 0)
            .unwrap_or_default()
            .to_string();
        let sop_instance = data_set
            .as_string(tags::SOP_INSTANCE_UID, 0)
            .ok_or_else(|| DimseError::data_set("instance has no SOPInstanceUID"))?
            .to_string();
        let id = self.association.next_message_id();
        let mut responses = self
            .exchange(Request::store(id, sop_class, sop_instance, data_set))
            .await?;
        responses
            .pop()
            .ok_or_else(|| DimseError::protocol("no C-STORE response"))
    }

    /// C-FIND; returns every response, the final one last
    pub async fn find(&mut self, sop_class: &str, query: DataSet) -> Result<Vec<Response>> {
        let id = self.association.next_message_id();
        self.exchange(Request::find(id, sop_class, query)).await
    }

    /// C-MOVE; returns every response, the final one last
    pub async fn move_to(
        &mut self,
        sop_class: &str,
        destination: &str,
        query: DataSet,
    ) -> Result<Vec<Response>> {
        let id = self.association.next_message_id();
        self.exchange(Request::move_to(id, sop_class, destination, query))
            .await
    }

    /// C-GET, answering every C-STORE sub-operation with success
    pub async fn get(&mut self, sop_class: &str, query: DataSet) -> Result<GetOutcome> {
        let id = self.association.next_message_id();
        self.association
            .send_message(Request::get(id, sop_class, query))
            .await?;

        let mut outcome = GetOutcome::default();
        loop {
            match self.association.receive_message().await? {
                Message::Request(store) if store.command == DimseCommand::Store => {
                    let reply = Response::to(&store, status::SUCCESS);
                    if let Some(data_set) = store.data_set {
                        outcome.received.push(data_set);
                    }
                    self.association.send_message(reply).await?;
                }
                Message::Request(other) => {
                    return Err(DimseError::protocol(format!(
                        "unexpected {} request during C-GET",
                        other.command
                    )))
                }
                Message::Response(response) => {
                    let pending = response.is_pending();
                    outcome.responses.push(response);
                    if !pending {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Release the association
    pub async fn release(self) -> Result<()> {
        self.association.release().await
    }

    async fn exchange(&mut self, request: Request) -> Result<Vec<Response>> {
        let command = request.command;
        self.association.send_message(request).await?;

        let mut responses = Vec::new();
        loop {
            match self.association.receive_message().await? {
                Message::Response(response) => {
                    let pending = response.is_pending();
                    responses.push(response);
                    if !pending {
                        debug!("{} finished after {} responses", command, responses.len());
                        return Ok(responses);
                    }
                }
                Message::Request(other) => {
                    return Err(DimseError::protocol(format!(
                        "unexpected {} request while waiting for {} responses",
                        other.command, command
                    )))
                }
            }
        }
    }
}

fn final_status(responses: &[Response]) -> Result<u16> {
    responses
        .last()
        .map(|r| r.status)
        .ok_or_else(|| DimseError::protocol("no response received"))
}
