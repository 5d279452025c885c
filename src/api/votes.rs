use rocket::{http::Status, response::status::Custom, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        reply::Reply,
        vote::{VoteDesc, VoteRequest, VotesDesc},
    },
    store::Storage,
};
use crate::voting;

pub fn routes() -> Vec<Route> {
    routes![submit_vote, get_votes]
}

#[post("/api/votes", data = "<request>", format = "json")]
pub async fn submit_vote(
    request: Json<VoteRequest>,
    store: Storage,
) -> Result<Custom<Json<Reply<VoteDesc>>>> {
    let vote = voting::submit_vote(&*store, request.0).await?;
    let reply = Reply::data(vote.into()).with_message("Vote submitted successfully");
    Ok(Custom(Status::Created, Json(reply)))
}

#[get("/api/votes")]
pub async fn get_votes(store: Storage) -> Result<Json<Reply<VotesDesc>>> {
    let summary = voting::get_votes(&*store).await?;
    let votes = VotesDesc {
        votes: summary.votes.into_iter().map(Into::into).collect(),
        vote_counts: summary.counts.into_iter().map(Into::into).collect(),
    };
    Ok(Json(Reply::data(votes)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json::Value},
    };

    use super::*;

    async fn post_vote(client: &Client, body: Value) -> (Status, Reply<Value>) {
        let response = client
            .post(uri!(submit_vote))
            .header(ContentType::JSON)
            .body(body.to_string())
            .dispatch()
            .await;
        let status = response.status();
        let reply = response.into_json::<Reply<Value>>().await.unwrap();
        (status, reply)
    }

    fn vote_body(email: &str, film_id: &str) -> Value {
        json!({
            "userName": "Ada Lovelace",
            "userEmail": email,
            "phone": "0612345678",
            "filmId": film_id,
            "filmTitle": format!("Title of {film_id}"),
        })
    }

    #[backend_test]
    async fn vote_is_created(client: Client, store: Storage) {
        let (status, reply) = post_vote(&client, vote_body("ada@example.com", "film1")).await;

        assert_eq!(status, Status::Created);
        assert!(reply.success);
        assert_eq!(reply.message.as_deref(), Some("Vote submitted successfully"));
        let data = reply.data.unwrap();
        assert_eq!(data["userEmail"], "ada@example.com");
        assert_eq!(data["userName"], "Ada Lovelace");
        assert_eq!(data["filmId"], "film1");
        assert_eq!(data["filmTitle"], "Title of film1");
        assert!(data["id"].is_string());
        assert!(data["createdAt"].is_string());

        let voter = store.find_voter("ada@example.com").await.unwrap().unwrap();
        assert_eq!(voter.phone, "0612345678");
    }

    #[backend_test]
    async fn second_vote_is_rejected(client: Client, store: Storage) {
        post_vote(&client, vote_body("ada@example.com", "film1")).await;

        let (status, reply) = post_vote(&client, vote_body("ada@example.com", "film2")).await;

        assert_eq!(status, Status::BadRequest);
        assert!(!reply.success);
        assert_eq!(reply.message.as_deref(), Some("You have already voted"));
        assert!(reply.data.is_none());
        assert_eq!(store.votes().await.unwrap().len(), 1);
    }

    #[backend_test]
    async fn vote_without_phone_stores_empty_phone(client: Client, store: Storage) {
        let body = json!({
            "userName": "Grace",
            "userEmail": "grace@example.com",
            "filmId": 3,
            "filmTitle": "Three",
        });

        let (status, reply) = post_vote(&client, body).await;

        assert_eq!(status, Status::Created);
        assert_eq!(reply.data.unwrap()["filmId"], "3");
        let voter = store.find_voter("grace@example.com").await.unwrap().unwrap();
        assert_eq!(voter.phone, "");
    }

    #[backend_test]
    async fn blank_email_is_a_bad_request(client: Client) {
        let (status, reply) = post_vote(&client, vote_body("  ", "film1")).await;

        assert_eq!(status, Status::BadRequest);
        assert!(!reply.success);
    }

    #[backend_test]
    async fn missing_email_gets_json_failure(client: Client, store: Storage) {
        let body = json!({
            "userName": "A",
            "filmId": "f1",
            "filmTitle": "T",
        });

        let (status, reply) = post_vote(&client, body).await;

        assert_eq!(status, Status::UnprocessableEntity);
        assert!(!reply.success);
        assert_eq!(reply.message.as_deref(), Some("Invalid request body"));
        assert!(store.votes().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn unknown_api_path_gets_json_failure(client: Client) {
        let response = client.get("/api/nothing-here").dispatch().await;

        assert_eq!(response.status(), Status::NotFound);
        let reply = response.into_json::<Reply<()>>().await.unwrap();
        assert!(!reply.success);
        assert_eq!(
            reply.message.as_deref(),
            Some("No such resource: /api/nothing-here")
        );
    }

    #[backend_test]
    async fn votes_and_counts_are_listed(client: Client) {
        for (email, film) in [("a@x.com", "film1"), ("b@x.com", "film1"), ("c@x.com", "film2")] {
            post_vote(&client, vote_body(email, film)).await;
        }

        let response = client.get(uri!(get_votes)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let reply = response.into_json::<Reply<VotesDesc>>().await.unwrap();

        assert!(reply.success);
        let summary = reply.data.unwrap();
        assert_eq!(summary.votes.len(), 3);
        let mut counts = summary.vote_counts;
        counts.sort_by(|a, b| a.film_id.cmp(&b.film_id));
        let counts: Vec<_> = counts
            .into_iter()
            .map(|c| (c.film_id, c.count))
            .collect();
        assert_eq!(
            counts,
            vec![("film1".to_string(), 2), ("film2".to_string(), 1)]
        );
    }

    #[backend_test]
    async fn empty_ledger_lists_nothing(client: Client) {
        let response = client.get(uri!(get_votes)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body = response.into_json::<Value>().await.unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "data": { "votes": [], "voteCounts": [] },
            })
        );
    }
}
