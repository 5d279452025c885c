use std::path::{Path, PathBuf};

use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sesv2::{
    config::{Credentials, Region},
    Client as SesClient,
};
use rocket::{
    fairing::{Fairing, Info, Kind},
    fs::{FileServer, Options},
    Build, Orbit, Rocket,
};
use serde::Deserialize;

use crate::mail::{Outbox, SesMailer};
use crate::model::store::{MemoryStore, MongoStore, Storage};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_festival_name")]
    festival_name: String,
    #[serde(default = "default_mail_from")]
    mail_from: String,
    #[serde(default = "default_uploads_dir")]
    uploads_dir: PathBuf,
    #[serde(default = "default_static_dir")]
    static_dir: PathBuf,
}

fn default_festival_name() -> String {
    "Festival Leonard De Vinci".to_string()
}

fn default_mail_from() -> String {
    "festival@localhost".to_string()
}

fn default_uploads_dir() -> PathBuf {
    "uploads".into()
}

fn default_static_dir() -> PathBuf {
    "frontend/public".into()
}

impl Config {
    /// The `From` header used for outgoing mail.
    pub fn mail_sender(&self) -> String {
        format!("\"{}\" <{}>", self.festival_name, self.mail_from)
    }

    /// Directory served under `/uploads`.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Directory holding the frontend, served under `/`.
    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

fn default_db_name() -> String {
    "festival".to_string()
}

/// A fairing that loads the database config, connects to MongoDB, makes sure
/// the unique indexes exist, and places a [`Storage`] handle into managed
/// state. Without a `db_uri`, votes are kept in memory instead.
///
/// The connection is closed again when the server shuts down.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite | Kind::Shutdown,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let storage = match config.db_uri {
            Some(db_uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&db_uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Storage::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, votes will only be kept in memory");
                Storage::new(MemoryStore::default())
            }
        };

        // Manage the state.
        rocket = rocket.manage(storage);
        Ok(rocket)
    }

    async fn on_shutdown(&self, rocket: &Rocket<Orbit>) {
        if let Some(storage) = rocket.state::<Storage>() {
            storage.shutdown().await;
        }
    }
}

/// Configuration for the AWS connection.
#[derive(Deserialize)]
struct AwsConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places an [`Outbox`] sending
/// through Amazon SES into managed state.
pub struct AwsFairing;

#[rocket::async_trait]
impl Fairing for AwsFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS SES",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<AwsConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load AWS config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the connection.
        let aws_config = SdkConfig::builder()
            .region(Region::new(config.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                config.aws_access_key_id,
                config.aws_secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build();
        let client = SesClient::new(&aws_config);
        info!("Loaded Amazon SES config");

        // Manage the state.
        rocket = rocket.manage(Outbox::new(SesMailer::new(client)));
        Ok(rocket)
    }
}

/// A fairing that mounts the uploads directory and the frontend.
/// Must be attached after [`ConfigFairing`].
pub struct StaticFilesFairing;

#[rocket::async_trait]
impl Fairing for StaticFilesFairing {
    fn info(&self) -> Info {
        Info {
            name: "Static files",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>().cloned() else {
            error!("Static files require the application config");
            return Err(rocket);
        };

        for dir in [config.uploads_dir(), config.static_dir()] {
            if !dir.is_dir() {
                warn!("Static directory {} does not exist", dir.display());
            }
        }

        // The frontend ranks below uploads so the two mounts do not collide.
        let options = Options::Index | Options::Missing;
        Ok(rocket
            .mount("/uploads", FileServer::new(config.uploads_dir(), options))
            .mount("/", FileServer::new(config.static_dir(), options).rank(20)))
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config: Config = Figment::new().extract().unwrap();

        assert_eq!(
            config.mail_sender(),
            "\"Festival Leonard De Vinci\" <festival@localhost>"
        );
        assert_eq!(config.uploads_dir(), Path::new("uploads"));
        assert_eq!(config.static_dir(), Path::new("frontend/public"));
    }

    #[test]
    fn values_are_read_from_figment() {
        let figment = Figment::new()
            .merge(Serialized::default("festival_name", "Cannes"))
            .merge(Serialized::default("mail_from", "jury@example.com"));

        let config: Config = figment.extract().unwrap();

        assert_eq!(config.mail_sender(), "\"Cannes\" <jury@example.com>");
    }
}
