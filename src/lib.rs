#[macro_use]
extern crate rocket;

use chrono::Duration;
use mongodb::Client;
use rocket::figment::Figment;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::billing::Billing;
use crate::config::Config;
use crate::error::{BackendError, ConfigurationError};
use crate::resp::jwt::TokenCodec;
use crate::route::mount_api;
use crate::security::Security;
use crate::store::{MongoStore, SharedStore};

pub mod billing;
pub mod config;
pub mod data;
pub mod error;
pub mod middleware;
pub mod resp;
pub mod role;
pub mod route;
pub mod security;
pub mod store;
pub mod util;

fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global logger: {}", err);
    };
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("Unable to forward log records: {}", err);
    }
}

/// Loads configuration, connects to MongoDB and builds the server.
pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        init_logging(l);
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            c
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            c
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            return Err(other.into());
        }
    };

    tracing::info!("Initializing token signing...");
    let security = Security::load(&c)?;
    let codec = TokenCodec::new(
        &security.token_secret,
        Duration::minutes(c.token_lifetime_minutes),
    );
    tracing::info!(
        "Access tokens are valid for {} minutes.",
        codec.lifetime().num_minutes()
    );

    tracing::info!("Connecting to MongoDB...");
    let client = Client::with_uri_str(c.mongodb_uri.as_str()).await?;

    tracing::info!("Using MongoDB database: {}", c.mongodb_db);
    let mongo = MongoStore::new(client.database(c.mongodb_db.as_str()));
    if let Err(e) = mongo.ping().await {
        tracing::error!("Unable to connect to MongoDB.");
        return Err(e.into());
    }

    let store: SharedStore = Arc::new(mongo);
    if let Err(e) = data::booking::prepare(store.as_ref()).await {
        tracing::warn!(
            "Unable to create the unique booking index, duplicate bookings are only checked before inserting: {}",
            e
        );
    }

    let billing = billing::from_config(&c);
    let figment = rocket::Config::figment().merge(("port", c.port));

    assemble(figment, store, codec, billing).map(|r| r.manage(c))
}

/// Builds the server around already constructed collaborators.
pub fn assemble(
    figment: Figment,
    store: SharedStore,
    codec: TokenCodec,
    billing: Billing,
) -> Result<Rocket<Build>, BackendError> {
    tracing::info!("Starting HTTP server...");
    let mut r = rocket::custom(figment)
        .manage(store)
        .manage(codec)
        .manage(billing);

    tracing::info!("Setting up CORS...");
    let allowed_origins = AllowedOrigins::All;

    let cors = rocket_cors::CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    r = r.attach(cors);
    r = mount_api(r);

    Ok(r)
}
