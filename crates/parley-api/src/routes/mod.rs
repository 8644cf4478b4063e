use axum::Json;
use utoipa::OpenApi;

pub mod chat;
pub mod engines;
pub mod health;
pub mod title;

#[derive(OpenApi)]
#[openapi(
    info(title = "Parley API", description = "Streaming chat backend"),
    paths(
        health::health_check,
        chat::chat,
        title::title,
        engines::list_engines,
        engines::list_models,
    ),
    tags(
        (name = "chat", description = "Streaming chat and titling"),
        (name = "engines", description = "Engine and model discovery"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
pub async fn openapi_doc() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_covers_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/chat", "/title", "/engines", "/models/{engine}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
