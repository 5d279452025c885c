use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        vote::{FilmTally, NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{Id, VOTES},
};

use super::{FestivalStore, Registration, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Collections {
    voters: Vec<Voter>,
    votes: Vec<Vote>,
    candidates: Vec<Candidate>,
}

/// A store that keeps everything in process memory.
///
/// Used when no database is configured, and by tests. Unique constraints are
/// checked under the same lock as the insert, so they hold under concurrency
/// exactly as MongoDB's unique indexes do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    /// When set, vote lookups see nothing, as if racing another request.
    blind_vote_lookups: AtomicBool,
    /// When set, the next vote insert fails with a non-duplicate error.
    fail_next_vote_insert: AtomicBool,
}

impl MemoryStore {
    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn blind_vote_lookups(&self) {
        self.blind_vote_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_vote_insert(&self) {
        self.fail_next_vote_insert.store(true, Ordering::SeqCst);
    }

    pub fn voters_with_email(&self, email: &str) -> usize {
        self.lock()
            .unwrap()
            .voters
            .iter()
            .filter(|voter| voter.email == email)
            .count()
    }
}

#[rocket::async_trait]
impl FestivalStore for MemoryStore {
    async fn find_vote(&self, voter_email: &str) -> StoreResult<Option<Vote>> {
        if self.blind_vote_lookups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let collections = self.lock()?;
        Ok(collections
            .votes
            .iter()
            .find(|vote| vote.voter_email == voter_email)
            .cloned())
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        if self.fail_next_vote_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected vote insert failure".to_string()));
        }
        let mut collections = self.lock()?;
        if collections
            .votes
            .iter()
            .any(|existing| existing.voter_email == vote.voter_email)
        {
            return Err(StoreError::DuplicateKey { collection: VOTES });
        }
        let vote = Vote { id: Id::new(), vote };
        collections.votes.push(vote.clone());
        Ok(vote)
    }

    async fn votes(&self) -> StoreResult<Vec<Vote>> {
        Ok(self.lock()?.votes.clone())
    }

    async fn vote_counts(&self) -> StoreResult<Vec<FilmTally>> {
        let collections = self.lock()?;
        Ok(FilmTally::tally(collections.votes.iter().map(|vote| &vote.vote)))
    }

    async fn find_voter(&self, email: &str) -> StoreResult<Option<Voter>> {
        let collections = self.lock()?;
        Ok(collections
            .voters
            .iter()
            .find(|voter| voter.email == email)
            .cloned())
    }

    async fn register_voter(&self, voter: NewVoter) -> StoreResult<Registration> {
        let mut collections = self.lock()?;
        if collections
            .voters
            .iter()
            .any(|existing| existing.email == voter.email)
        {
            return Ok(Registration::Existing);
        }
        collections.voters.push(Voter { id: Id::new(), voter });
        Ok(Registration::Created)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        self.lock()?.candidates.push(candidate.clone());
        Ok(candidate)
    }

    async fn candidates(&self) -> StoreResult<Vec<Candidate>> {
        Ok(self.lock()?.candidates.clone())
    }
}
