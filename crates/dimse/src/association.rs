//! Associations: negotiated parameters and the framed transport carrying them
//!
//! Every PDU travels as one length-delimited frame holding a JSON document.
//! An association starts with an associate request answered by an accept or
//! a reject, carries [`Message`]s, and ends with a release handshake or an
//! abort.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, warn};

use crate::message::Message;
use crate::{DimseError, Result};

/// Largest frame accepted on the wire
pub const MAX_FRAME_LENGTH: usize = 512 * 1024 * 1024;

/// Default maximum length advertised in association requests
pub const DEFAULT_MAXIMUM_LENGTH: u32 = 16384;

/// Outcome of one presentation context negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationContextResult {
    Acceptance,
    UserRejection,
    NoReason,
    AbstractSyntaxNotSupported,
    TransferSyntaxesNotSupported,
}

/// An abstract syntax and the transfer syntaxes proposed (or accepted) for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationContext {
    pub id: u8,
    pub abstract_syntax: String,
    pub transfer_syntaxes: Vec<String>,
    #[serde(default = "default_true")]
    pub scu_role_support: bool,
    #[serde(default)]
    pub scp_role_support: bool,
    #[serde(default)]
    pub result: Option<PresentationContextResult>,
}

impl PresentationContext {
    pub fn new(id: u8, abstract_syntax: impl Into<String>, transfer_syntaxes: Vec<String>) -> Self {
        Self {
            id,
            abstract_syntax: abstract_syntax.into(),
            transfer_syntaxes,
            scu_role_support: true,
            scp_role_support: false,
            result: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.result == Some(PresentationContextResult::Acceptance)
    }
}

/// User identity negotiation sub-item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserIdentity {
    #[default]
    None,
    Username {
        username: String,
    },
    UsernamePassword {
        username: String,
        password: String,
    },
    Jwt {
        token: String,
    },
}

/// Parameters proposed in an associate request, or negotiated in an accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationParameters {
    pub calling_ae_title: String,
    pub called_ae_title: String,
    #[serde(default)]
    pub presentation_contexts: Vec<PresentationContext>,
    #[serde(default)]
    pub user_identity: UserIdentity,
    #[serde(default = "default_maximum_length")]
    pub maximum_length: u32,
}

impl AssociationParameters {
    pub fn new(calling_ae_title: impl Into<String>, called_ae_title: impl Into<String>) -> Self {
        Self {
            calling_ae_title: calling_ae_title.into(),
            called_ae_title: called_ae_title.into(),
            presentation_contexts: Vec::new(),
            user_identity: UserIdentity::None,
            maximum_length: DEFAULT_MAXIMUM_LENGTH,
        }
    }

    /// Propose one more presentation context; ids are odd and increasing
    pub fn with_presentation_context<S: Into<String>>(
        mut self,
        abstract_syntax: impl Into<String>,
        transfer_syntaxes: impl IntoIterator<Item = S>,
    ) -> Self {
        let id = (self.presentation_contexts.len() * 2 + 1) as u8;
        self.presentation_contexts.push(PresentationContext::new(
            id,
            abstract_syntax,
            transfer_syntaxes.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn with_user_identity(mut self, identity: UserIdentity) -> Self {
        self.user_identity = identity;
        self
    }

    pub fn with_maximum_length(mut self, maximum_length: u32) -> Self {
        self.maximum_length = maximum_length;
        self
    }

    /// True when any presentation context proposes `abstract_syntax`
    pub fn has_abstract_syntax(&self, abstract_syntax: &str) -> bool {
        self.presentation_contexts
            .iter()
            .any(|pc| pc.abstract_syntax == abstract_syntax)
    }

    /// Accepted context for an abstract syntax, if any
    pub fn accepted_context(&self, abstract_syntax: &str) -> Option<&PresentationContext> {
        self.presentation_contexts
            .iter()
            .find(|pc| pc.abstract_syntax == abstract_syntax && pc.is_accepted())
    }
}

/// Protocol data units exchanged on the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pdu", content = "body")]
pub enum Pdu {
    AssociateRq(AssociationParameters),
    AssociateAc(AssociationParameters),
    AssociateRj { reason: String },
    Data(Message),
    ReleaseRq,
    ReleaseRp,
    Abort,
}

/// An established association over any byte stream
pub struct Association<S = TcpStream> {
    framed: Framed<S, LengthDelimitedCodec>,
    parameters: AssociationParameters,
    peer_addr: Option<SocketAddr>,
    next_message_id: u16,
}

impl<S> std::fmt::Debug for Association<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("parameters", &self.parameters)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

impl Association<TcpStream> {
    /// Open a TCP connection and request an association
    pub async fn connect(
        host: &str,
        port: u16,
        parameters: AssociationParameters,
        timeout: Duration,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                DimseError::Network(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connection to {}:{} timed out", host, port),
                ))
            })??;
        let peer_addr = stream.peer_addr().ok();
        let mut association = Self::request(stream, parameters).await?;
        association.peer_addr = peer_addr;
        Ok(association)
    }
}

impl<S> Association<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn framed(stream: S) -> Framed<S, LengthDelimitedCodec> {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LENGTH)
            .new_codec();
        Framed::new(stream, codec)
    }

    /// Requestor side of the handshake over an already connected stream
    pub async fn request(stream: S, parameters: AssociationParameters) -> Result<Self> {
        let mut framed = Self::framed(stream);
        send_pdu(&mut framed, &Pdu::AssociateRq(parameters)).await?;
        match receive_pdu(&mut framed).await? {
            Pdu::AssociateAc(negotiated) => Ok(Self {
                framed,
                parameters: negotiated,
                peer_addr: None,
                next_message_id: 1,
            }),
            Pdu::AssociateRj { reason } => Err(DimseError::AssociationRejected(reason)),
            Pdu::Abort => Err(DimseError::AssociationAborted),
            other => Err(DimseError::protocol(format!(
                "unexpected reply to associate request: {:?}",
                other
            ))),
        }
    }

    /// Acceptor side of the handshake
    ///
    /// `acceptor` receives the proposed parameters and returns the negotiated
    /// ones, or `DimseError::AssociationRejected` to turn the peer away.
    pub async fn accept<F>(stream: S, peer_addr: Option<SocketAddr>, acceptor: F) -> Result<Self>
    where
        F: FnOnce(&AssociationParameters) -> Result<AssociationParameters>,
    {
        let mut framed = Self::framed(stream);
        let proposed = match receive_pdu(&mut framed).await? {
            Pdu::AssociateRq(proposed) => proposed,
            other => {
                let _ = send_pdu(&mut framed, &Pdu::Abort).await;
                return Err(DimseError::protocol(format!(
                    "expected an associate request, got {:?}",
                    other
                )));
            }
        };

        match acceptor(&proposed) {
            Ok(negotiated) => {
                send_pdu(&mut framed, &Pdu::AssociateAc(negotiated.clone())).await?;
                debug!(
                    "Association accepted: {} -> {}",
                    negotiated.calling_ae_title, negotiated.called_ae_title
                );
                Ok(Self {
                    framed,
                    parameters: negotiated,
                    peer_addr,
                    next_message_id: 1,
                })
            }
            Err(DimseError::AssociationRejected(reason)) => {
                send_pdu(
                    &mut framed,
                    &Pdu::AssociateRj {
                        reason: reason.clone(),
                    },
                )
                .await?;
                Err(DimseError::AssociationRejected(reason))
            }
            Err(e) => {
                let _ = send_pdu(&mut framed, &Pdu::Abort).await;
                Err(e)
            }
        }
    }

    /// Negotiated parameters
    pub fn parameters(&self) -> &AssociationParameters {
        &self.parameters
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Allocate a message id for a request sent on this association
    pub fn next_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1).max(1);
        id
    }

    /// Receive the next message
    ///
    /// A release request is answered and reported as
    /// `DimseError::AssociationReleased`; an abort or a closed transport as
    /// `DimseError::AssociationAborted`.
    pub async fn receive_message(&mut self) -> Result<Message> {
        match receive_pdu(&mut self.framed).await? {
            Pdu::Data(message) => Ok(message),
            Pdu::ReleaseRq => {
                send_pdu(&mut self.framed, &Pdu::ReleaseRp).await?;
                Err(DimseError::AssociationReleased)
            }
            Pdu::Abort => Err(DimseError::AssociationAborted),
            other => {
                warn!("Unexpected PDU on established association: {:?}", other);
                self.abort().await;
                Err(DimseError::protocol("unexpected PDU on established association"))
            }
        }
    }

    pub async fn send_message(&mut self, message: impl Into<Message>) -> Result<()> {
        send_pdu(&mut self.framed, &Pdu::Data(message.into())).await
    }

    /// Graceful release, initiated locally
    pub async fn release(mut self) -> Result<()> {
        send_pdu(&mut self.framed, &Pdu::ReleaseRq).await?;
        loop {
            match receive_pdu(&mut self.framed).await? {
                Pdu::ReleaseRp => return Ok(()),
                Pdu::Abort => return Err(DimseError::AssociationAborted),
                // Late data is dropped once release has started
                Pdu::Data(_) => continue,
                other => {
                    return Err(DimseError::protocol(format!(
                        "unexpected reply to release request: {:?}",
                        other
                    )))
                }
            }
        }
    }

    /// Abort the association; errors are ignored since the link is going away
    pub async fn abort(&mut self) {
        let _ = send_pdu(&mut self.framed, &Pdu::Abort).await;
    }
}

async fn send_pdu<S>(framed: &mut Framed<S, LengthDelimitedCodec>, pdu: &Pdu) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let bytes = serde_json::to_vec(pdu)?;
    framed.send(Bytes::from(bytes)).await?;
    Ok(())
}

async fn receive_pdu<S>(framed: &mut Framed<S, LengthDelimitedCodec>) -> Result<Pdu>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(frame)) => Ok(serde_json::from_slice(&frame)?),
        Some(Err(e)) if is_disconnect(&e) => Err(DimseError::AssociationAborted),
        Some(Err(e)) => Err(e.into()),
        None => Err(DimseError::AssociationAborted),
    }
}

fn is_disconnect(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}

fn default_true() -> bool {
    true
}

fn default_maximum_length() -> u32 {
    DEFAULT_MAXIMUM_LENGTH
}
