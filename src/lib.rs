#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod mail;
pub mod model;
pub mod voting;

pub use config::Config;

use config::{AwsFairing, ConfigFairing, DatabaseFairing, StaticFilesFairing};
use cors::CorsFairing;
use logging::LoggerFairing;

/// Assemble the server: routes, logging, configuration, storage and mail.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(LoggerFairing)
        .attach(CorsFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(AwsFairing)
        .attach(StaticFilesFairing)
}

/// The server as used by tests: the given store and mailer instead of the
/// configured ones, and no static files.
#[cfg(test)]
fn rocket_for_store_and_mailer(
    store: model::store::Storage,
    mailer: mail::RecordingMailer,
) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", error::catchers())
        .attach(LoggerFairing)
        .attach(CorsFairing)
        .attach(ConfigFairing)
        .manage(store)
        .manage(mail::Outbox::new(mailer))
}

/// Database URI used by tests that need a real MongoDB.
#[cfg(test)]
fn test_db_uri() -> String {
    std::env::var("ROCKET_DB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

/// A fresh database name, so concurrent tests cannot see each other's data.
#[cfg(test)]
fn test_db_name() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{Header, Method, Status},
        local::asynchronous::Client,
    };

    #[backend_test]
    async fn responses_allow_any_origin(client: Client) {
        let response = client.get("/api/votes").dispatch().await;

        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("*")
        );
    }

    #[backend_test]
    async fn preflight_is_answered(client: Client) {
        let response = client.req(Method::Options, "/api/votes").dispatch().await;

        assert_eq!(response.status(), Status::NoContent);
        assert!(response
            .headers()
            .get_one("Access-Control-Allow-Methods")
            .unwrap()
            .contains("POST"));
    }

    #[backend_test]
    async fn preflight_echoes_requested_headers(client: Client) {
        let response = client
            .req(Method::Options, "/api/votes")
            .header(Header::new(
                "Access-Control-Request-Headers",
                "content-type, x-requested-with",
            ))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::NoContent);
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Headers"),
            Some("content-type, x-requested-with")
        );
    }
}
