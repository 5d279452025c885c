use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core voter identity, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Natural key of the voter; unique across the registry.
    pub email: String,
    pub name: String,
    /// Always present; empty if the voter gave no number.
    pub phone: String,
}

impl VoterCore {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            phone: phone.unwrap_or_default(),
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_phone_becomes_empty_string() {
        let voter = NewVoter::new("Grace", "grace@example.com", None);
        assert_eq!(voter.phone, "");

        let doc = mongodb::bson::to_document(&voter).unwrap();
        assert_eq!(doc.get_str("phone").unwrap(), "");
    }
}
