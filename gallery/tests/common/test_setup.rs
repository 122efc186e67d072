use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use gallery::{
    gallery::GalleryViewModel,
    gateway::{GatewayConfig, ImageGateway},
    identity::{IdentityResolver, JwtVerifier, Principal},
    server,
    test_utils::{InstrumentedStore, StaticIdentity},
    types::Environment,
};
use tower::ServiceExt;

use super::utils::multipart_body;

pub const TEST_JWT_SECRET: &[u8] = b"gallery-test-secret";
pub const TEST_AUDIENCE: &str = "authenticated";

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Gateway over an instrumented in-memory store
pub fn instrumented_gateway(config: GatewayConfig) -> (Arc<InstrumentedStore>, Arc<ImageGateway>) {
    let store = Arc::new(InstrumentedStore::new());
    let gateway = Arc::new(ImageGateway::new(store.clone(), config));
    (store, gateway)
}

/// View-model wired to a static identity and an instrumented store
pub struct ViewModelSetup {
    pub identity: Arc<StaticIdentity>,
    pub store: Arc<InstrumentedStore>,
    pub gateway: Arc<ImageGateway>,
    pub view_model: Arc<GalleryViewModel>,
}

impl ViewModelSetup {
    pub fn signed_in(id: &str) -> Self {
        Self::with_identity(StaticIdentity::signed_in(id))
    }

    pub fn signed_out() -> Self {
        Self::with_identity(StaticIdentity::signed_out())
    }

    fn with_identity(identity: StaticIdentity) -> Self {
        setup_test_env();

        let identity = Arc::new(identity);
        let (store, gateway) = instrumented_gateway(GatewayConfig::default());
        let view_model = Arc::new(GalleryViewModel::new(
            identity.clone() as Arc<dyn IdentityResolver>,
            gateway.clone(),
        ));

        Self {
            identity,
            store,
            gateway,
            view_model,
        }
    }
}

/// Router test setup with verifier, gateway and instrumented store
pub struct TestContext {
    pub router: Router,
    pub environment: Environment,
    pub store: Arc<InstrumentedStore>,
    pub gateway: Arc<ImageGateway>,
    pub verifier: Arc<JwtVerifier>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_environment(Environment::Development {
            disable_auth: false,
        })
    }

    pub fn with_environment(environment: Environment) -> Self {
        setup_test_env();

        let (store, gateway) = instrumented_gateway(GatewayConfig::default());
        let verifier = Arc::new(JwtVerifier::new(
            TEST_JWT_SECRET,
            Some(TEST_AUDIENCE.to_string()),
        ));

        let router = server::app(environment.clone(), gateway.clone(), verifier.clone());

        Self {
            router,
            environment,
            store,
            gateway,
            verifier,
        }
    }

    /// Access token for `id` as the identity provider would issue it
    pub fn token_for(&self, id: &str) -> String {
        let principal = Principal::new(id).expect("valid principal id");
        self.verifier
            .issue(&principal, Duration::from_secs(3600))
            .expect("Failed to issue token")
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn send_get_request(&self, route: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(route).method("GET");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send_delete_request(&self, route: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(route).method("DELETE");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send_upload_request(
        &self,
        token: Option<&str>,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Response {
        let (boundary, body) = multipart_body(field, file_name, content_type, data);

        let mut builder = Request::builder()
            .uri("/v1/images")
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}
