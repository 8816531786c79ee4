//! Static OpenAPI document and Swagger UI shell (spec.md §4.5; supplemented
//! per `SPEC_FULL.md` §5.1 from `original_source/mkm/handlers/openapi_handlers.py`,
//! which serves a static `swagger.yaml` plus a minimal Swagger-UI HTML page).
//! Both are served straight off disk with [`ServeFile`], the same way the
//! teacher reaches for `tower-http`'s `fs` feature for static assets.

use tower_http::services::ServeFile;

/// `GET /api/swagger.yaml`.
pub fn swagger_yaml_service() -> ServeFile {
    ServeFile::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static/swagger.yaml"))
}

/// `GET /api/docs`.
pub fn swagger_docs_service() -> ServeFile {
    ServeFile::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static/docs.html"))
}
