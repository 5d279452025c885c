use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A film submission, as stored in the database.
///
/// Every field is passed through from the submission form as-is, except the
/// photos, which hold the base64 encoding of the uploaded files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub director: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub synopsis: Option<String>,
    pub film_file: Option<String>,
    pub pdf: Option<String>,
    pub photo_realisateur: Option<String>,
    pub photo_film: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self {
                director: Some("Agnès Varda".to_string()),
                email: Some("agnes@example.com".to_string()),
                title: Some("Cléo de 5 à 7".to_string()),
                duration: Some("90".to_string()),
                country: Some("France".to_string()),
                category: Some("Fiction".to_string()),
                synopsis: Some("Two hours in the life of a singer.".to_string()),
                ..Default::default()
            }
        }
    }
}
