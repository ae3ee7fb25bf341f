// src/web/handlers/contact_handlers.rs
use chrono::Utc;
use rocket::form::Form;
use rocket::serde::json::Json;

use super::verify_nonce;
use crate::app_log;
use crate::core::log_store;
use crate::core::AppContext;
use crate::email::templates::{contact_confirmation_email, contact_team_email, ContactNotice};
use crate::render::anonymize;
use crate::types::logs::{ContactEvent, CONTACT_LOG_KEY};
use crate::utils::{is_valid_email, sanitize_text_field, sanitize_textarea_field};
use crate::web::types::{ClientInfo, ContactForm, ContactResponse, StandardErrorResponse};

const MIN_NAME_CHARS: usize = 2;
const MIN_MESSAGE_CHARS: usize = 10;
const MAX_LINKS: usize = 2;
const BANNED_WORDS: [&str; 4] = ["viagra", "cialis", "casino", "poker"];

#[derive(Debug, Clone, Default)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub company: String,
    pub message: String,
    pub trainer_id: i64,
}

impl ContactInput {
    fn from_form(form: &ContactForm) -> Self {
        Self {
            name: sanitize_text_field(&form.contact_name),
            email: form.contact_email.trim().to_string(),
            company: sanitize_text_field(&form.contact_company),
            message: sanitize_textarea_field(&form.contact_message),
            trainer_id: form.trainer_id.unwrap_or(0),
        }
    }
}

/// Short labels joined into a single "Données invalides: ..." message.
pub fn validate_contact(input: &ContactInput) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if input.name.chars().count() < MIN_NAME_CHARS {
        errors.push("Nom invalide");
    }
    if !is_valid_email(&input.email) {
        errors.push("Email invalide");
    }
    if input.message.chars().count() < MIN_MESSAGE_CHARS {
        errors.push("Message trop court");
    }
    if input.trainer_id <= 0 {
        errors.push("ID formateur manquant");
    }

    if input.message.matches("http").count() > MAX_LINKS {
        errors.push("Trop de liens");
    }
    let lowered = input.message.to_lowercase();
    if BANNED_WORDS.iter().any(|word| lowered.contains(word)) {
        errors.push("Contenu interdit");
    }

    errors
}

pub async fn contact_trainer_handler(
    form: Form<ContactForm>,
    client: ClientInfo,
    ctx: &AppContext,
) -> Result<Json<ContactResponse>, Json<StandardErrorResponse>> {
    verify_nonce(ctx, &form.nonce)?;
    contact_trainer(ctx, ContactInput::from_form(&form), &client).await
}

/// Relay a contact request about a trainer to the team and confirm receipt.
pub async fn contact_trainer(
    ctx: &AppContext,
    input: ContactInput,
    client: &ClientInfo,
) -> Result<Json<ContactResponse>, Json<StandardErrorResponse>> {
    let errors = validate_contact(&input);
    if !errors.is_empty() {
        return Err(Json(StandardErrorResponse::new(
            format!("Données invalides: {}", errors.join(", ")),
            "validation_failed",
        )));
    }

    let trainer = match ctx.datastore.find_approved(input.trainer_id).await {
        Ok(Some(trainer)) => trainer,
        Ok(None) => {
            return Err(Json(StandardErrorResponse::new(
                "Formateur non trouvé",
                "trainer_not_found",
            )))
        }
        Err(e) => {
            app_log!(error, "Contact lookup for #{} failed: {:#}", input.trainer_id, e);
            return Err(Json(StandardErrorResponse::new(
                "Erreur serveur. Veuillez réessayer.",
                "database_error",
            )));
        }
    };

    let Some(contact_email) = ctx.config.contact_email().map(str::to_string) else {
        app_log!(error, "No valid contact or admin email configured");
        return Err(Json(StandardErrorResponse::new(
            "Configuration email manquante - Contactez l'administrateur",
            "no_email_config",
        )));
    };

    let trainer_name = anonymize(&trainer.last_name, &trainer.first_name);
    let reference = trainer.public_reference();
    let subject = format!(
        "[CONTACT FORMATEUR] {} - #{}",
        ctx.config.settings.site.name, reference
    );

    let body = contact_team_email(&ContactNotice {
        trainer_display_name: &trainer_name,
        trainer_reference: &reference,
        trainer_specialties: &trainer.specialties,
        trainer_regions: &trainer.intervention_regions,
        requester_name: &input.name,
        requester_email: &input.email,
        requester_company: &input.company,
        message: &input.message,
        site_url: &ctx.config.settings.site.url,
        requester_ip: &client.ip,
        sent_at: Utc::now(),
    });

    let headers = vec![
        format!(
            "Reply-To: \"{}\" <{}>",
            input.name.replace(['"', '\\'], ""),
            input.email
        ),
        "X-Priority: 3".to_string(),
    ];

    app_log!(
        info,
        "Contact attempt: trainer={}, from={}, to={}",
        trainer.id,
        input.email,
        contact_email
    );

    let outcome = ctx
        .email
        .send_unthrottled(&contact_email, &subject, body, &headers)
        .await;

    let event = ContactEvent {
        timestamp: Utc::now(),
        trainer_id: trainer.id,
        from_email: input.email.clone(),
        to_email: contact_email.clone(),
        success: outcome.is_ok(),
        ip: client.ip.clone(),
        user_agent: client.user_agent.clone(),
    };
    if let Err(e) = log_store::append_log(ctx.datastore.as_ref(), CONTACT_LOG_KEY, event).await {
        app_log!(error, "Failed to record contact event: {:#}", e);
    }

    match outcome {
        Ok(()) => {
            let confirmation = contact_confirmation_email(
                &input.name,
                &trainer_name,
                &ctx.email.template_context(),
            );
            if !ctx
                .email
                .send_email(
                    &input.email,
                    "Confirmation - Demande de contact reçue",
                    &confirmation,
                    &[],
                )
                .await
            {
                app_log!(warn, "Contact confirmation to {} not sent", input.email);
            }

            Ok(Json(ContactResponse {
                success: true,
                message: "Votre demande a été transmise avec succès !".to_string(),
                details: format!(
                    "Un email a été envoyé à notre équipe concernant le formateur {}.",
                    trainer_name
                ),
            }))
        }
        Err(e) => {
            app_log!(error, "Contact email failed: {:#}", e);
            Err(Json(
                StandardErrorResponse::new("Erreur lors de l'envoi de votre demande", "send_failed")
                    .with_technical("Erreur serveur: l'envoi de l'email a échoué")
                    .with_suggestion(format!(
                        "Veuillez réessayer ou nous contacter directement à: {}",
                        contact_email
                    )),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_store::load_log;
    use crate::core::Datastore;
    use crate::test_support::{new_trainer, TestHarness};
    use crate::types::TrainerStatus;

    fn client() -> ClientInfo {
        ClientInfo {
            ip: "203.0.113.9".to_string(),
            user_agent: "tests".to_string(),
        }
    }

    fn request(trainer_id: i64) -> ContactInput {
        ContactInput {
            name: "Jean Client".to_string(),
            email: "jean@client.example".to_string(),
            company: "Client SA".to_string(),
            message: "Bonjour,\nNous cherchons une formation Rust pour dix personnes.".to_string(),
            trainer_id,
        }
    }

    async fn approved_trainer(harness: &TestHarness) -> i64 {
        harness
            .db
            .insert_trainer(&new_trainer("Marie", "Dupont", "marie@example.com"))
            .await
            .unwrap()
    }

    #[test]
    fn test_validation_labels() {
        let errors = validate_contact(&ContactInput {
            name: "J".to_string(),
            email: "nope".to_string(),
            message: "Viagra http://a http://b http://c".to_string(),
            ..Default::default()
        });
        assert_eq!(
            errors,
            vec![
                "Nom invalide",
                "Email invalide",
                "ID formateur manquant",
                "Trop de liens",
                "Contenu interdit"
            ]
        );

        assert!(validate_contact(&request(1)).is_empty());
    }

    #[tokio::test]
    async fn test_contact_relays_to_team_and_confirms() {
        let harness = TestHarness::new().await;
        let id = approved_trainer(&harness).await;

        let response = contact_trainer(&harness.ctx, request(id), &client())
            .await
            .unwrap()
            .into_inner();

        assert!(response.success);
        assert_eq!(
            response.details,
            "Un email a été envoyé à notre équipe concernant le formateur D. Marie."
        );

        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 2);

        let team = &sent[0];
        assert_eq!(team.to, "contact@example.com");
        assert_eq!(
            team.subject,
            format!("[CONTACT FORMATEUR] Formateurs Pro - #{:04}", id)
        );
        assert_eq!(
            team.reply_to.as_deref(),
            Some("\"Jean Client\" <jean@client.example>")
        );
        assert!(team
            .headers
            .iter()
            .any(|(name, value)| name == "X-Priority" && value == "3"));
        assert!(team.html_body.contains("IP: 203.0.113.9"));
        assert!(!team.html_body.contains("marie@example.com"));

        let confirmation = &sent[1];
        assert_eq!(confirmation.to, "jean@client.example");
        assert_eq!(confirmation.subject, "Confirmation - Demande de contact reçue");

        let log = load_log::<ContactEvent>(&*harness.db, CONTACT_LOG_KEY)
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].success);
        assert_eq!(log.entries()[0].user_agent, "tests");
    }

    #[tokio::test]
    async fn test_pending_trainer_cannot_be_contacted() {
        let harness = TestHarness::new().await;
        let mut pending = new_trainer("Paul", "Martin", "paul@example.com");
        pending.status = TrainerStatus::Pending;
        let id = harness.db.insert_trainer(&pending).await.unwrap();

        let err = contact_trainer(&harness.ctx, request(id), &client())
            .await
            .unwrap_err()
            .into_inner();
        assert_eq!(err.message, "Formateur non trouvé");
        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_logged_with_suggestion() {
        let harness = TestHarness::new().await;
        let id = approved_trainer(&harness).await;
        harness.mailer.fail_with("connection refused");

        let err = contact_trainer(&harness.ctx, request(id), &client())
            .await
            .unwrap_err()
            .into_inner();

        assert!(!err.success);
        assert_eq!(err.code, "send_failed");
        let technical = err.technical.unwrap();
        assert_eq!(technical, "Erreur serveur: l'envoi de l'email a échoué");
        assert!(!technical.contains("connection refused"));
        assert_eq!(
            err.suggestion.as_deref(),
            Some("Veuillez réessayer ou nous contacter directement à: contact@example.com")
        );

        let log = load_log::<ContactEvent>(&*harness.db, CONTACT_LOG_KEY)
            .await
            .unwrap();
        assert!(!log.entries()[0].success);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_reported_as_missing_trainer() {
        let harness = TestHarness::new().await;
        let id = approved_trainer(&harness).await;
        harness.db.pool().close().await;

        let err = contact_trainer(&harness.ctx, request(id), &client())
            .await
            .unwrap_err()
            .into_inner();

        assert_eq!(err.code, "database_error");
        assert_ne!(err.message, "Formateur non trouvé");
        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_admin_address() {
        let harness = TestHarness::with_yaml_patch(|yaml| {
            yaml.replacen("contact_email: contact@example.com", "contact_email: broken", 1)
        })
        .await;
        let id = approved_trainer(&harness).await;

        contact_trainer(&harness.ctx, request(id), &client())
            .await
            .unwrap();
        assert_eq!(harness.mailer.sent()[0].to, "admin@example.com");
    }
}
