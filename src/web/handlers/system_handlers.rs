// src/web/handlers/system_handlers.rs
use rocket::fs::NamedFile;
use rocket::http::Status;
use rocket::serde::json::Json;

use crate::app_log;
use crate::core::AppContext;
use crate::upload_validator::UploadKind;
use crate::web::types::{HealthResponse, NonceResponse, StandardErrorResponse};

pub async fn nonce_handler(ctx: &AppContext) -> Result<Json<NonceResponse>, Json<StandardErrorResponse>> {
    match ctx.nonces.issue() {
        Ok(nonce) => Ok(Json(NonceResponse {
            success: true,
            nonce,
            expires_in_minutes: ctx.config.settings.security.token_ttl_minutes,
        })),
        Err(e) => {
            app_log!(error, "Failed to issue nonce: {:#}", e);
            Err(Json(StandardErrorResponse::new(
                "Erreur de sécurité. Veuillez recharger la page.",
                "nonce_error",
            )))
        }
    }
}

pub async fn health_handler(ctx: &AppContext) -> Json<HealthResponse> {
    match ctx.datastore.health_check().await {
        Ok(()) => Json(HealthResponse {
            success: true,
            status: "ok".to_string(),
            database: "ok".to_string(),
        }),
        Err(e) => {
            app_log!(error, "Health check failed: {:#}", e);
            Json(HealthResponse {
                success: false,
                status: "degraded".to_string(),
                database: "unavailable".to_string(),
            })
        }
    }
}

/// Serve a stored photo. CVs are never exposed this way.
pub async fn photo_handler(file: &str, ctx: &AppContext) -> Result<NamedFile, Status> {
    let relative = format!("{}/{}", UploadKind::Photo.subdir(), file);
    let Some(path) = ctx.files.resolve(&relative) else {
        app_log!(warn, "Refused photo path: {}", file);
        return Err(Status::NotFound);
    };

    NamedFile::open(&path).await.map_err(|_| Status::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload_validator::{fixtures, IncomingFile};

    #[tokio::test]
    async fn test_issued_nonce_is_accepted() {
        let harness = crate::test_support::TestHarness::new().await;
        let response = nonce_handler(&harness.ctx).await.unwrap().into_inner();

        assert!(harness.ctx.nonces.verify(&response.nonce));
        assert_eq!(response.expires_in_minutes, 720);
    }

    #[tokio::test]
    async fn test_health_reports_database() {
        let harness = crate::test_support::TestHarness::new().await;
        let response = health_handler(&harness.ctx).await.into_inner();
        assert!(response.success);
        assert_eq!(response.database, "ok");
    }

    #[tokio::test]
    async fn test_photo_serving() {
        let harness = crate::test_support::TestHarness::new().await;
        let stored = harness
            .ctx
            .files
            .save(UploadKind::Photo, &IncomingFile::new("portrait.png", fixtures::png()))
            .await
            .unwrap();
        let name = stored.relative_path.trim_start_matches("photos/").to_string();

        assert!(photo_handler(&name, &harness.ctx).await.is_ok());
        assert_eq!(
            photo_handler("../cv/secret.pdf", &harness.ctx).await.unwrap_err(),
            Status::NotFound
        );
        assert_eq!(
            photo_handler("missing.png", &harness.ctx).await.unwrap_err(),
            Status::NotFound
        );
    }
}
