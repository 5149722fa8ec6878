use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::middleware::logging;
use crate::routes::{auth, chat, documents, health, search, users};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::google_login,
        auth::logout,
        auth::me,
        chat::chat,
        chat::list_conversations,
        chat::get_conversation,
        chat::delete_conversation,
        chat::list_models,
        documents::create_document,
        documents::list_documents,
        documents::get_document,
        documents::update_document,
        documents::delete_document,
        documents::export_document,
        search::search_documents,
        users::get_user,
        users::update_user,
    ),
    components(schemas(
        health::HealthResponse,
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::GoogleLoginRequest,
        auth::TokenResponse,
        chat::IncomingMessage,
        chat::ChatRequestBody,
        chat::ChatResponseBody,
        chat::ConversationSummaryResponse,
        chat::MessageResponse,
        chat::ConversationResponse,
        chat::ModelsResponse,
        documents::CreateDocumentRequest,
        documents::UpdateDocumentRequest,
        documents::DocumentResponse,
        users::UserResponse,
        users::UpdateUserRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Registration, login and tokens"),
        (name = "chat", description = "Assistant conversations"),
        (name = "documents", description = "Document storage and export"),
        (name = "search", description = "Document search"),
        (name = "users", description = "Profiles")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google-login", post(auth::google_login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/users/me", get(auth::me))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/chat/conversations", get(chat::list_conversations))
        .route(
            "/chat/conversation/:conversation_id",
            get(chat::get_conversation).delete(chat::delete_conversation),
        )
        .route("/chat/models", get(chat::list_models))
        // Documents
        .route(
            "/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route(
            "/documents/:document_id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route(
            "/documents/:document_id/export",
            get(documents::export_document),
        )
        // Search
        .route("/search", get(search::search_documents))
        // Users
        .route(
            "/users/:user_id",
            get(users::get_user).put(users::update_user),
        );

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
