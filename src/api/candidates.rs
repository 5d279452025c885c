use rocket::{form::Form, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        candidate::{CandidateDesc, CandidatureForm},
        reply::Reply,
    },
    db::candidate::NewCandidate,
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![list_candidates, submit_candidature]
}

#[get("/api/users")]
pub async fn list_candidates(store: Storage) -> Result<Json<Vec<CandidateDesc>>> {
    let candidates = store.candidates().await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[post("/api/submit-candidature", data = "<form>")]
pub async fn submit_candidature(
    form: Form<CandidatureForm<'_>>,
    store: Storage,
) -> Result<Json<Reply<()>>> {
    let candidate: NewCandidate = form.into_inner().into();
    let candidate = store.insert_candidate(candidate).await?;
    info!("Saved candidature {}", candidate.id);
    Ok(Json(Reply::ok("Candidature saved successfully")))
}
