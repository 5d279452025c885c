use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Catcher, Request,
};
use thiserror::Error;

use crate::mail::MailError;
use crate::model::{api::reply::Reply, store::StoreError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The voter's email already has a vote in the ledger.
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("{0}")]
    BadRequest(String),
    #[error("Server error: {0}")]
    Store(#[from] StoreError),
    #[error("Failed to send email")]
    Mail(#[from] MailError),
}

impl Error {
    pub fn status(&self) -> Status {
        match self {
            Self::AlreadyVoted | Self::BadRequest(_) => Status::BadRequest,
            Self::Store(_) | Self::Mail(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self:?}"),
            _ => warn!("{self}"),
        }
        (status, Json(Reply::failure(self.to_string()))).respond_to(req)
    }
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Failures that never reached a handler: unparseable bodies, unknown paths,
/// oversized uploads, failed guards.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> (Status, Json<Reply<()>>) {
    let message = match status.code {
        400 | 422 => "Invalid request body".to_string(),
        404 => format!("No such resource: {}", req.uri().path()),
        413 => "Request body too large".to_string(),
        500 => "Server error".to_string(),
        _ => status.reason_lossy().to_string(),
    };
    warn!("{} {}: {message}", status.code, req.uri());
    (status, Json(Reply::failure(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_is_a_client_error() {
        assert_eq!(Error::AlreadyVoted.status(), Status::BadRequest);
        assert_eq!(Error::AlreadyVoted.to_string(), "You have already voted");
    }

    #[test]
    fn store_failures_carry_their_cause() {
        let err = Error::from(StoreError::Unavailable("connection reset".to_string()));
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(
            err.to_string(),
            "Server error: Storage unavailable: connection reset"
        );
    }
}
