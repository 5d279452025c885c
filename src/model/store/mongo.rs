use mongodb::{
    bson::{doc, from_document, Document},
    error::Error as DbError,
    options::UpdateOptions,
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        vote::{FilmTally, NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id, VOTES},
};

use super::{FestivalStore, Registration, StoreError, StoreResult};

/// A store backed by a MongoDB database.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the given database and make sure its unique indexes exist.
    pub async fn connect(db_uri: &str, db_name: &str) -> Result<Self, DbError> {
        let client = Client::with_uri_str(db_uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn inserted_id(id: mongodb::bson::Bson) -> StoreResult<Id> {
        id.as_object_id().map(Id::from).ok_or_else(|| {
            StoreError::Unavailable(format!("database returned a non-ObjectId key: {id}"))
        })
    }
}

/// Group votes by film, keeping the first title seen for each.
fn vote_count_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$group": {
                "_id": "$film_id",
                "count": { "$sum": 1 },
                "film_title": { "$first": "$film_title" },
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "film_id": "$_id",
                "film_title": 1,
                "count": 1,
            }
        },
    ]
}

#[rocket::async_trait]
impl FestivalStore for MongoStore {
    async fn find_vote(&self, voter_email: &str) -> StoreResult<Option<Vote>> {
        let filter = doc! {
            "voter_email": voter_email,
        };
        Ok(Coll::<Vote>::from_db(&self.db)
            .find_one(filter, None)
            .await?)
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let result = Coll::<NewVote>::from_db(&self.db)
            .insert_one(&vote, None)
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    StoreError::DuplicateKey { collection: VOTES }
                } else {
                    StoreError::Db(err)
                }
            })?;
        let id = Self::inserted_id(result.inserted_id)?;
        Ok(Vote { id, vote })
    }

    async fn votes(&self) -> StoreResult<Vec<Vote>> {
        Ok(Coll::<Vote>::from_db(&self.db)
            .find(None, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn vote_counts(&self) -> StoreResult<Vec<FilmTally>> {
        let documents: Vec<Document> = Coll::<Vote>::from_db(&self.db)
            .aggregate(vote_count_pipeline(), None)
            .await?
            .try_collect()
            .await?;
        documents
            .into_iter()
            .map(|document| {
                from_document(document).map_err(|e| StoreError::Db(DbError::from(e)))
            })
            .collect()
    }

    async fn find_voter(&self, email: &str) -> StoreResult<Option<Voter>> {
        let filter = doc! {
            "email": email,
        };
        Ok(Coll::<Voter>::from_db(&self.db)
            .find_one(filter, None)
            .await?)
    }

    async fn register_voter(&self, voter: NewVoter) -> StoreResult<Registration> {
        // Only ever written on insert, so an existing identity is left alone.
        // The email itself comes from the filter.
        let filter = doc! {
            "email": &voter.email,
        };
        let update = doc! {
            "$setOnInsert": {
                "name": &voter.name,
                "phone": &voter.phone,
            },
        };
        let options = UpdateOptions::builder().upsert(true).build();
        match Coll::<NewVoter>::from_db(&self.db)
            .update_one(filter, update, options)
            .await
        {
            Ok(result) if result.upserted_id.is_some() => Ok(Registration::Created),
            Ok(_) => Ok(Registration::Existing),
            // Two upserts raced and the other one inserted first.
            Err(err) if is_duplicate_key_error(&err) => Ok(Registration::Existing),
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> StoreResult<Candidate> {
        let result = Coll::<NewCandidate>::from_db(&self.db)
            .insert_one(&candidate, None)
            .await?;
        let id = Self::inserted_id(result.inserted_id)?;
        Ok(Candidate { id, candidate })
    }

    async fn candidates(&self) -> StoreResult<Vec<Candidate>> {
        Ok(Coll::<Candidate>::from_db(&self.db)
            .find(None, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn shutdown(&self) {
        info!("Closing database connection");
        self.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::store::Storage;

    #[backend_test(mongo)]
    async fn unique_index_rejects_second_vote(store: Storage) {
        store
            .insert_vote(NewVote::example("a@x.com", "film1"))
            .await
            .unwrap();

        let result = store
            .insert_vote(NewVote::example("a@x.com", "film2"))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::DuplicateKey { collection: VOTES })
        ));
        assert_eq!(store.votes().await.unwrap().len(), 1);
    }

    #[backend_test(mongo)]
    async fn upsert_does_not_overwrite_voter(store: Storage) {
        let first = NewVoter::example();
        let mut second = NewVoter::example();
        second.name = "Changed".to_string();

        assert_eq!(
            store.register_voter(first.clone()).await.unwrap(),
            Registration::Created
        );
        assert_eq!(
            store.register_voter(second).await.unwrap(),
            Registration::Existing
        );

        let stored = store.find_voter(&first.email).await.unwrap().unwrap();
        assert_eq!(stored.voter, first);
    }

    #[backend_test(mongo)]
    async fn aggregation_groups_by_film(store: Storage) {
        for (email, film) in [("a@x.com", "film1"), ("b@x.com", "film1"), ("c@x.com", "film2")] {
            store.insert_vote(NewVote::example(email, film)).await.unwrap();
        }

        let mut counts = store.vote_counts().await.unwrap();
        counts.sort_by(|a, b| a.film_id.cmp(&b.film_id));

        assert_eq!(
            counts,
            vec![
                FilmTally {
                    film_id: "film1".to_string(),
                    film_title: "Title of film1".to_string(),
                    count: 2,
                },
                FilmTally {
                    film_id: "film2".to_string(),
                    film_title: "Title of film2".to_string(),
                    count: 1,
                },
            ]
        );
    }

    #[backend_test(mongo)]
    async fn empty_ledger_has_no_counts(store: Storage) {
        assert!(store.votes().await.unwrap().is_empty());
        assert!(store.vote_counts().await.unwrap().is_empty());
    }
}
