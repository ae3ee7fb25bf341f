pub mod contact_handlers;
pub mod registration_handlers;
pub mod search_handlers;
pub mod system_handlers;

pub use contact_handlers::*;
pub use registration_handlers::*;
pub use search_handlers::*;
pub use system_handlers::*;

use rocket::serde::json::Json;

use crate::app_log;
use crate::core::AppContext;
use crate::web::types::StandardErrorResponse;

/// Reject the request unless it carries a valid anti-forgery token.
pub(crate) fn verify_nonce(ctx: &AppContext, nonce: &str) -> Result<(), Json<StandardErrorResponse>> {
    if ctx.nonces.verify(nonce) {
        return Ok(());
    }
    app_log!(warn, "Request rejected: invalid nonce");
    Err(Json(StandardErrorResponse::new(
        "Erreur de sécurité. Veuillez recharger la page.",
        "invalid_nonce",
    )))
}
