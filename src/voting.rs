//! One vote per voter email, and per-film vote totals.

use crate::error::{Error, Result};
use crate::model::{
    api::vote::VoteRequest,
    db::{
        vote::{FilmTally, NewVote, Vote},
        voter::NewVoter,
    },
    store::{FestivalStore, Registration, StoreError},
};

/// Record a vote, unless this voter's email has voted before.
///
/// The lookup up front only spares the store a doomed insert; the unique
/// constraint on the insert itself is what keeps two racing submissions from
/// both succeeding. Either way the loser sees [`Error::AlreadyVoted`].
pub async fn submit_vote(store: &dyn FestivalStore, request: VoteRequest) -> Result<Vote> {
    let email = request.user_email.trim();
    if email.is_empty() {
        return Err(Error::BadRequest("userEmail is required".to_string()));
    }

    if store.find_vote(email).await?.is_some() {
        info!("Rejected repeat vote from {email}");
        return Err(Error::AlreadyVoted);
    }

    // A voter created here is kept even if the vote insert below fails.
    let voter = NewVoter::new(&request.user_name, email, request.phone);
    if store.register_voter(voter).await? == Registration::Created {
        debug!("Registered voter {email}");
    }

    let vote = NewVote::new(email, request.user_name, request.film_id, request.film_title);
    match store.insert_vote(vote).await {
        Ok(vote) => {
            info!("Recorded vote {} for film {}", vote.id, vote.film_id);
            Ok(vote)
        }
        Err(StoreError::DuplicateKey { .. }) => {
            warn!("Concurrent vote from {email} lost the race");
            Err(Error::AlreadyVoted)
        }
        Err(err) => Err(err.into()),
    }
}

/// Every vote together with how many each film received.
#[derive(Debug, Clone)]
pub struct VoteSummary {
    pub votes: Vec<Vote>,
    pub counts: Vec<FilmTally>,
}

/// Read the whole ledger. Never modifies anything.
pub async fn get_votes(store: &dyn FestivalStore) -> Result<VoteSummary> {
    let votes = store.votes().await?;
    let counts = store.vote_counts().await?;
    Ok(VoteSummary { votes, counts })
}
