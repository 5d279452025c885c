//! Persistence behind a single trait, so that the voting rules can be
//! exercised identically against MongoDB and the in-memory store.

use std::ops::Deref;
use std::sync::Arc;

use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    State,
};
use thiserror::Error;

use crate::model::db::{
    candidate::{Candidate, NewCandidate},
    vote::{FilmTally, NewVote, Vote},
    voter::{NewVoter, Voter},
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert would have violated a unique index.
    #[error("Duplicate key in collection `{collection}`")]
    DuplicateKey { collection: &'static str },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of registering a voter identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Registration {
    /// No voter with that email existed; one was created.
    Created,
    /// A voter with that email already existed and was left untouched.
    Existing,
}

/// Everything the festival needs from its persistence layer.
#[rocket::async_trait]
pub trait FestivalStore: Send + Sync {
    /// Find the vote cast by the given email, if any.
    async fn find_vote(&self, voter_email: &str) -> StoreResult<Option<Vote>>;

    /// Insert a vote.
    ///
    /// Must fail with [`StoreError::DuplicateKey`] if a vote with the same
    /// voter email already exists, however the two inserts interleave.
    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote>;

    /// All votes, in storage order.
    async fn votes(&self) -> StoreResult<Vec<Vote>>;

    /// Per-film vote counts.
    async fn vote_counts(&self) -> StoreResult<Vec<FilmTally>>;

    async fn find_voter(&self, email: &str) -> StoreResult<Option<Voter>>;

    /// Create the voter unless one with the same email exists.
    /// An existing voter is never modified.
    async fn register_voter(&self, voter: NewVoter) -> StoreResult<Registration>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate>;

    async fn candidates(&self) -> StoreResult<Vec<Candidate>>;

    /// Release any connections held by the store.
    async fn shutdown(&self) {}
}

/// Shared handle on the configured store. Placed into managed state at
/// ignition and handed to each request as a guard.
#[derive(Clone)]
pub struct Storage(Arc<dyn FestivalStore>);

impl Storage {
    pub fn new(store: impl FestivalStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Storage {
    type Target = dyn FestivalStore;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Storage {
    type Error = ();

    /// Get the storage handle from the managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<&State<Storage>>().await {
            request::Outcome::Success(storage) => request::Outcome::Success(storage.inner().clone()),
            _ => {
                error!("Storage is not in managed state");
                request::Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
