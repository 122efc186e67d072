use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use gallery::{
    gateway::ImageGateway,
    identity::JwtVerifier,
    server,
    storage::{MemoryObjectStore, ObjectStore, S3ObjectStore},
    types::{Environment, StorageBackend},
};
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // JSON logs for staging/production, regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt().json().with_env_filter(filter).init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(filter).init();
        }
    }

    let store: Arc<dyn ObjectStore> = match environment.storage_backend() {
        StorageBackend::S3 => {
            let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
            Arc::new(S3ObjectStore::new(s3_client, environment.s3_bucket()))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory object store, images are lost on restart");
            Arc::new(MemoryObjectStore::with_random_key())
        }
    };

    let gateway = Arc::new(ImageGateway::new(store, environment.gateway_config()));
    let verifier = Arc::new(JwtVerifier::new(
        environment.jwt_secret().as_bytes(),
        environment.jwt_audience(),
    ));

    server::start(environment, gateway, verifier).await
}
