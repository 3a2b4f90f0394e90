//! Service class providers: turn archive results into DIMSE responses
//!
//! Failures of the archive become a final response carrying the mapped
//! status and an error comment; only transport errors are returned.

use dimse::{
    status, tags, Association, DataSet, DimseScu, Message, Request, Response, SubOperations,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::archive::{self, DataSetGenerator, FindGenerator, GetGenerator, MoveGenerator};
use crate::error::{ArchiveError, Result};
use crate::server::dispatcher::Session;

fn failure(request: &Request, error: &ArchiveError) -> Response {
    match error {
        ArchiveError::NotAuthorized(_) => tracing::warn!("{} refused: {}", request.command, error),
        _ => tracing::error!("{} failed: {}", request.command, error),
    }
    Response::to(request, error.status()).with_error_comment(error.to_string())
}

pub async fn echo<S>(session: &Session, association: &mut Association<S>, request: Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let response = match archive::echo(&session.archive, &session.principal).await {
        Ok(()) => Response::to(&request, status::SUCCESS),
        Err(e) => failure(&request, &e),
    };
    association.send_message(response).await?;
    Ok(())
}

pub async fn store<S>(session: &Session, association: &mut Association<S>, request: Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let outcome = archive::store(&session.archive, &session.principal, request.data_set.as_ref()).await;
    let response = match outcome {
        Ok(()) => Response::to(&request, status::SUCCESS),
        Err(e) => failure(&request, &e),
    };
    association.send_message(response).await?;
    Ok(())
}

pub async fn find<S>(session: &Session, association: &mut Association<S>, request: Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut generator = FindGenerator::new(session.archive.clone(), session.principal.clone());
    if let Err(e) = generator.initialize(&request).await {
        association.send_message(failure(&request, &e)).await?;
        return Ok(());
    }

    while !generator.done() {
        match generator.get().await {
            Ok(data_set) => {
                let pending = Response::to(&request, status::PENDING).with_data_set(data_set);
                association.send_message(pending).await?;
            }
            Err(e) => {
                association.send_message(failure(&request, &e)).await?;
                return Ok(());
            }
        }
        generator.next();
    }

    association
        .send_message(Response::to(&request, status::SUCCESS))
        .await?;
    Ok(())
}

/// Sub-operation bookkeeping shared by C-GET and C-MOVE
#[derive(Debug)]
struct Progress {
    counts: SubOperations,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            counts: SubOperations {
                remaining: total as u32,
                ..Default::default()
            },
        }
    }

    fn record(&mut self, sub_status: Option<u16>) {
        self.counts.remaining = self.counts.remaining.saturating_sub(1);
        match sub_status {
            Some(s) if status::is_success(s) => self.counts.completed += 1,
            Some(s) if status::is_warning(s) => self.counts.warning += 1,
            _ => self.counts.failed += 1,
        }
    }

    fn pending(&self, request: &Request) -> Response {
        Response::to(request, status::PENDING).with_sub_operations(self.counts)
    }

    fn finished(&self, request: &Request) -> Response {
        let final_status = if self.counts.failed > 0 || self.counts.warning > 0 {
            status::SUB_OPERATIONS_COMPLETE_WITH_FAILURES
        } else {
            status::SUCCESS
        };
        Response::to(request, final_status).with_sub_operations(self.counts)
    }
}

fn sub_operation_request(id: u16, data_set: DataSet) -> Request {
    let sop_class = data_set
        .as_string(tags::SOP_CLASS_UID, 0)
        .unwrap_or_default()
        .to_string();
    let sop_instance = data_set
        .as_string(tags::SOP_INSTANCE_UID, 0)
        .unwrap_or_default()
        .to_string();
    Request::store(id, sop_class, sop_instance, data_set)
}

pub async fn get<S>(session: &Session, association: &mut Association<S>, request: Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut generator = GetGenerator::new(session.archive.clone(), session.principal.clone());
    if let Err(e) = generator.initialize(&request).await {
        association.send_message(failure(&request, &e)).await?;
        return Ok(());
    }

    let mut progress = Progress::new(generator.count());
    while !generator.done() {
        let sub_status = match generator.get().await {
            Ok(data_set) => {
                let id = association.next_message_id();
                association
                    .send_message(sub_operation_request(id, data_set))
                    .await?;
                match association.receive_message().await? {
                    Message::Response(response) => Some(response.status),
                    Message::Request(other) => {
                        return Err(ArchiveError::Dimse(dimse::DimseError::protocol(format!(
                            "unexpected {} request during C-GET",
                            other.command
                        ))))
                    }
                }
            }
            Err(e) => {
                tracing::error!("C-GET sub-operation failed: {}", e);
                None
            }
        };
        progress.record(sub_status);
        generator.next();
        if !generator.done() {
            association.send_message(progress.pending(&request)).await?;
        }
    }

    association.send_message(progress.finished(&request)).await?;
    Ok(())
}

pub async fn move_<S>(session: &Session, association: &mut Association<S>, request: Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut generator = MoveGenerator::new(session.archive.clone(), session.principal.clone());
    if let Err(e) = generator.initialize(&request).await {
        association.send_message(failure(&request, &e)).await?;
        return Ok(());
    }
    let destination = match generator.get_association(&request).await {
        Ok(destination) => destination,
        Err(e) => {
            association.send_message(failure(&request, &e)).await?;
            return Ok(());
        }
    };

    let mut progress = Progress::new(generator.count());
    if generator.count() > 0 {
        tracing::info!(
            "🚚 Moving {} instances to {} at {}:{}",
            generator.count(),
            destination.parameters.called_ae_title,
            destination.host,
            destination.port
        );
        let sub_association = Association::connect(
            &destination.host,
            destination.port,
            destination.parameters,
            session.connect_timeout,
        )
        .await;
        let mut scu = match sub_association {
            Ok(sub_association) => DimseScu::new(sub_association),
            Err(e) => {
                let error = ArchiveError::Dimse(e);
                association.send_message(failure(&request, &error)).await?;
                return Ok(());
            }
        };

        while !generator.done() {
            let sub_status = match generator.get().await {
                Ok(data_set) => match scu.store(data_set).await {
                    Ok(response) => Some(response.status),
                    Err(e) => {
                        tracing::error!("C-MOVE sub-operation failed: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::error!("C-MOVE sub-operation failed: {}", e);
                    None
                }
            };
            progress.record(sub_status);
            generator.next();
            if !generator.done() {
                association.send_message(progress.pending(&request)).await?;
            }
        }

        if let Err(e) = scu.release().await {
            tracing::warn!("C-MOVE sub-association did not release cleanly: {}", e);
        }
    }

    association.send_message(progress.finished(&request)).await?;
    Ok(())
}
