use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::db::vote::{FilmTally, Vote};

/// A vote as submitted by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub film_id: String,
    pub film_title: String,
}

/// Film IDs arrive as either strings or numbers depending on the page.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Integer(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

/// API-friendly representation of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDesc {
    pub id: String,
    pub user_email: String,
    pub user_name: String,
    pub film_id: String,
    pub film_title: String,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteDesc {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.to_string(),
            user_email: vote.vote.voter_email,
            user_name: vote.vote.voter_name,
            film_id: vote.vote.film_id,
            film_title: vote.vote.film_title,
            created_at: vote.vote.created_at,
        }
    }
}

/// API-friendly representation of a film's vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCountDesc {
    pub film_id: String,
    pub film_title: String,
    pub count: u64,
}

impl From<FilmTally> for VoteCountDesc {
    fn from(tally: FilmTally) -> Self {
        Self {
            film_id: tally.film_id,
            film_title: tally.film_title,
            count: tally.count,
        }
    }
}

/// Every vote, plus the per-film totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotesDesc {
    pub votes: Vec<VoteDesc>,
    pub vote_counts: Vec<VoteCountDesc>,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl VoteRequest {
        pub fn example(user_email: &str, film_id: &str) -> Self {
            Self {
                user_name: "Example Voter".to_string(),
                user_email: user_email.to_string(),
                phone: Some("0612345678".to_string()),
                film_id: film_id.to_string(),
                film_title: format!("Title of {film_id}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn numeric_film_id_is_accepted() {
        let request: VoteRequest = serde_json::from_value(json!({
            "userName": "Ada",
            "userEmail": "ada@example.com",
            "filmId": 7,
            "filmTitle": "Seven",
        }))
        .unwrap();

        assert_eq!(request.film_id, "7");
        assert_eq!(request.phone, None);
    }

    #[test]
    fn null_phone_is_accepted() {
        let request: VoteRequest = serde_json::from_value(json!({
            "userName": "Ada",
            "userEmail": "ada@example.com",
            "phone": null,
            "filmId": "film1",
            "filmTitle": "One",
        }))
        .unwrap();

        assert_eq!(request.phone, None);
    }
}
