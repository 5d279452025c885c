use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core vote data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Email of the voter. Unique across all votes.
    pub voter_email: String,
    /// Name of the voter at the time of voting.
    pub voter_name: String,
    pub film_id: String,
    /// Title of the film at the time of voting.
    pub film_title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a new vote, timestamped now.
    pub fn new(
        voter_email: impl Into<String>,
        voter_name: impl Into<String>,
        film_id: impl Into<String>,
        film_title: impl Into<String>,
    ) -> Self {
        Self {
            voter_email: voter_email.into(),
            voter_name: voter_name.into(),
            film_id: film_id.into(),
            film_title: film_title.into(),
            created_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// Number of votes cast for a single film.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmTally {
    pub film_id: String,
    /// The title carried by the first vote seen for this film.
    pub film_title: String,
    pub count: u64,
}

impl FilmTally {
    /// Group votes by film, in the order each film is first seen.
    pub fn tally<'a>(votes: impl IntoIterator<Item = &'a VoteCore>) -> Vec<FilmTally> {
        let mut tallies: Vec<FilmTally> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for vote in votes {
            match positions.get(vote.film_id.as_str()) {
                Some(&i) => tallies[i].count += 1,
                None => {
                    positions.insert(&vote.film_id, tallies.len());
                    tallies.push(FilmTally {
                        film_id: vote.film_id.clone(),
                        film_title: vote.film_title.clone(),
                        count: 1,
                    });
                }
            }
        }
        tallies
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoteCore {
        pub fn example(voter_email: &str, film_id: &str) -> Self {
            Self::new(
                voter_email,
                "Example Voter",
                film_id,
                format!("Title of {film_id}"),
            )
        }
    }
}
