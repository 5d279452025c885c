use data_encoding::BASE64;
use serde::{Deserialize, Serialize};

use crate::model::db::candidate::{Candidate, NewCandidate};

/// A film submission, as posted by the candidature page.
#[derive(Debug, FromForm)]
pub struct CandidatureForm<'r> {
    pub director: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub synopsis: Option<String>,
    #[field(name = "filmFile")]
    pub film_file: Option<String>,
    pub pdf: Option<String>,
    #[field(name = "photo-realisateur")]
    pub photo_realisateur: Option<&'r [u8]>,
    #[field(name = "photo-film")]
    pub photo_film: Option<&'r [u8]>,
}

impl From<CandidatureForm<'_>> for NewCandidate {
    fn from(form: CandidatureForm<'_>) -> Self {
        Self {
            director: form.director,
            email: form.email,
            title: form.title,
            duration: form.duration,
            country: form.country,
            category: form.category,
            synopsis: form.synopsis,
            film_file: form.film_file,
            pdf: form.pdf,
            photo_realisateur: encode_upload(form.photo_realisateur),
            photo_film: encode_upload(form.photo_film),
        }
    }
}

/// An empty file part means no file was chosen.
fn encode_upload(upload: Option<&[u8]>) -> Option<String> {
    upload
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| BASE64.encode(bytes))
}

/// API-friendly representation of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDesc {
    pub id: String,
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

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        let id = candidate.id.to_string();
        let c = candidate.candidate;
        Self {
            id,
            director: c.director,
            email: c.email,
            title: c.title,
            duration: c.duration,
            country: c.country,
            category: c.category,
            synopsis: c.synopsis,
            film_file: c.film_file,
            pdf: c.pdf,
            photo_realisateur: c.photo_realisateur,
            photo_film: c.photo_film,
        }
    }
}
