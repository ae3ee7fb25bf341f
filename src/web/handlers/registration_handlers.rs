// src/web/handlers/registration_handlers.rs
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use serde_json::json;
use tokio::io::AsyncReadExt;

use super::verify_nonce;
use crate::app_log;
use crate::core::AppContext;
use crate::email::EmailTemplate;
use crate::phone::{process_phone_number, validate_phone_field, PhoneInput};
use crate::types::{ExperienceLevel, NewTrainer, TrainerStatus};
use crate::upload_validator::{IncomingFile, UploadError, UploadErrorKind, UploadKind};
use crate::utils::{is_valid_email, is_valid_url, sanitize_text_field, sanitize_textarea_field};
use crate::web::types::{RegistrationForm, RegistrationResponse, StandardErrorResponse};

const MIN_EXPERIENCE_CHARS: usize = 50;

/// Registration fields with the uploads already read into memory.
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country_code: String,
    pub custom_country_code: String,
    pub phone: String,
    pub company: String,
    pub linkedin_url: String,
    pub specialties: Vec<String>,
    pub intervention_regions: Vec<String>,
    pub experience: String,
    pub experience_level: String,
    pub availability: String,
    pub hourly_rate: String,
    pub bio: String,
    pub rgpd_consent: bool,
    pub marketing_consent: bool,
    pub cv_file: Option<IncomingFile>,
    pub photo_file: Option<IncomingFile>,
}

impl RegistrationInput {
    fn phone_input(&self) -> PhoneInput<'_> {
        PhoneInput::new(&self.country_code, &self.custom_country_code, &self.phone)
    }
}

/// A file field the browser actually filled in.
fn provided(file: &Option<IncomingFile>) -> Option<&IncomingFile> {
    file.as_ref()
        .filter(|file| !file.file_name.is_empty() || !file.bytes.is_empty())
}

async fn read_temp_file(file: Option<&TempFile<'_>>) -> Result<Option<IncomingFile>, UploadError> {
    let Some(file) = file else {
        return Ok(None);
    };

    let file_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .unwrap_or_default();

    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await.map_err(|e| {
        app_log!(error, "Failed to open uploaded file {}: {}", file_name, e);
        UploadError::new(UploadErrorKind::Transport, "Erreur lors de l'upload: Upload incomplet")
    })?;
    tokio::pin!(reader);
    reader.read_to_end(&mut bytes).await.map_err(|e| {
        app_log!(error, "Failed to read uploaded file {}: {}", file_name, e);
        UploadError::new(UploadErrorKind::Transport, "Erreur lors de l'upload: Upload incomplet")
    })?;

    Ok(Some(IncomingFile::new(file_name, bytes)))
}

/// Every field-level problem, in form order.
pub fn validate_registration(input: &RegistrationInput) -> Vec<String> {
    let mut errors = Vec::new();

    // emptiness is judged on what would actually be stored
    let experience = sanitize_textarea_field(&input.experience);
    let required = [
        (sanitize_text_field(&input.first_name), "Le prénom est obligatoire"),
        (sanitize_text_field(&input.last_name), "Le nom est obligatoire"),
        (input.email.trim().to_string(), "L'email est obligatoire"),
        (input.phone.trim().to_string(), "Le téléphone est obligatoire"),
        (experience.clone(), "L'expérience est obligatoire"),
        (input.experience_level.trim().to_string(), "Le niveau d'expérience est obligatoire"),
    ];
    for (value, message) in required {
        if value.is_empty() {
            errors.push(message.to_string());
        }
    }

    if !input.email.trim().is_empty() && !is_valid_email(input.email.trim()) {
        errors.push("Format d'email invalide".to_string());
    }

    if !input.phone.trim().is_empty() {
        errors.extend(validate_phone_field(&input.phone_input()));
    }

    if !input.experience_level.is_empty()
        && input.experience_level.parse::<ExperienceLevel>().is_err()
    {
        errors.push("Niveau d'expérience invalide".to_string());
    }

    if clean_list(&input.specialties).is_empty() {
        errors.push("Veuillez sélectionner au moins une spécialité".to_string());
    }

    if clean_list(&input.intervention_regions).is_empty() {
        errors.push("Veuillez sélectionner au moins une zone d'intervention".to_string());
    }

    let experience_chars = experience.chars().count();
    if experience_chars > 0 && experience_chars < MIN_EXPERIENCE_CHARS {
        errors.push("L'expérience doit contenir au moins 50 caractères".to_string());
    }

    if !input.rgpd_consent {
        errors.push("Le consentement RGPD est obligatoire".to_string());
    }

    if provided(&input.cv_file).is_none() {
        errors.push("Le CV est obligatoire".to_string());
    }

    if !input.linkedin_url.trim().is_empty() && !is_valid_url(input.linkedin_url.trim()) {
        errors.push("L'URL LinkedIn n'est pas valide".to_string());
    }

    errors
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| sanitize_text_field(value))
        .filter(|value| !value.is_empty())
        .collect()
}

fn upload_failure(kind: UploadKind, error: &UploadError) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(error.user_message(kind), "file_upload_failed"))
}

pub async fn submit_registration_handler(
    form: Form<RegistrationForm<'_>>,
    ctx: &AppContext,
) -> Result<Json<RegistrationResponse>, Json<StandardErrorResponse>> {
    verify_nonce(ctx, &form.nonce)?;

    let cv_file = read_temp_file(form.cv_file.as_ref())
        .await
        .map_err(|e| upload_failure(UploadKind::Cv, &e))?;
    let photo_file = read_temp_file(form.photo_file.as_ref())
        .await
        .map_err(|e| upload_failure(UploadKind::Photo, &e))?;

    let form = form.into_inner();
    let input = RegistrationInput {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        country_code: form.country_code,
        custom_country_code: form.custom_country_code,
        phone: form.phone,
        company: form.company,
        linkedin_url: form.linkedin_url,
        specialties: form.specialties,
        intervention_regions: form.intervention_regions,
        experience: form.experience,
        experience_level: form.experience_level,
        availability: form.availability,
        hourly_rate: form.hourly_rate,
        bio: form.bio,
        rgpd_consent: form.rgpd_consent,
        marketing_consent: form.marketing_consent,
        cv_file,
        photo_file,
    };

    register_trainer(ctx, input).await
}

/// Validate, store the uploads, persist and notify.
pub async fn register_trainer(
    ctx: &AppContext,
    input: RegistrationInput,
) -> Result<Json<RegistrationResponse>, Json<StandardErrorResponse>> {
    let errors = validate_registration(&input);
    if !errors.is_empty() {
        app_log!(info, "Registration rejected with {} validation errors", errors.len());
        return Err(Json(
            StandardErrorResponse::new(
                "Données invalides. Veuillez corriger les erreurs.",
                "validation_failed",
            )
            .with_errors(errors),
        ));
    }

    let email = input.email.trim().to_lowercase();
    match ctx.datastore.email_exists(&email).await {
        Ok(false) => {}
        Ok(true) => {
            return Err(Json(StandardErrorResponse::new(
                "Cet email est déjà enregistré. Utilisez une autre adresse email.",
                "email_exists",
            )))
        }
        Err(e) => {
            app_log!(error, "Email lookup failed: {:#}", e);
            return Err(Json(StandardErrorResponse::new(
                "Erreur lors de l'enregistrement. Veuillez réessayer.",
                "database_error",
            )));
        }
    }

    let cv_file = match provided(&input.cv_file) {
        Some(file) => ctx
            .files
            .save(UploadKind::Cv, file)
            .await
            .map_err(|e| upload_failure(UploadKind::Cv, &e))?
            .relative_path,
        None => String::new(),
    };
    let photo_file = match provided(&input.photo_file) {
        Some(file) => ctx
            .files
            .save(UploadKind::Photo, file)
            .await
            .map_err(|e| upload_failure(UploadKind::Photo, &e))?
            .relative_path,
        None => String::new(),
    };

    let auto_approve = ctx.config.settings.notifications.auto_approve;
    let experience_level = input
        .experience_level
        .parse::<ExperienceLevel>()
        .unwrap_or(ExperienceLevel::Intermediaire);

    let trainer = NewTrainer {
        first_name: sanitize_text_field(&input.first_name),
        last_name: sanitize_text_field(&input.last_name),
        email,
        phone: process_phone_number(&input.phone_input()),
        company: sanitize_text_field(&input.company),
        linkedin_url: input.linkedin_url.trim().to_string(),
        specialties: clean_list(&input.specialties),
        intervention_regions: clean_list(&input.intervention_regions),
        experience: sanitize_textarea_field(&input.experience),
        experience_level,
        availability: sanitize_text_field(&input.availability),
        hourly_rate: sanitize_text_field(&input.hourly_rate),
        bio: sanitize_textarea_field(&input.bio),
        cv_file,
        photo_file,
        rgpd_consent: input.rgpd_consent,
        marketing_consent: input.marketing_consent,
        status: if auto_approve {
            TrainerStatus::Approved
        } else {
            TrainerStatus::Pending
        },
    };

    let trainer_id = match ctx.datastore.insert_trainer(&trainer).await {
        Ok(id) => id,
        Err(e) => {
            app_log!(error, "Trainer insert failed: {:#}", e);
            return Err(Json(StandardErrorResponse::new(
                "Erreur lors de l'enregistrement. Veuillez réessayer.",
                "database_error",
            )));
        }
    };

    send_registration_notifications(ctx, &trainer, trainer_id).await;

    let message = if auto_approve {
        "Votre inscription a été validée avec succès ! Vous recevrez bientôt des opportunités."
    } else {
        "Votre inscription a été envoyée avec succès ! Nous examinerons votre profil et vous contacterons bientôt."
    };

    app_log!(info, "Trainer #{} registered ({})", trainer_id, trainer.status);

    Ok(Json(RegistrationResponse {
        success: true,
        message: message.to_string(),
        trainer_id,
        redirect: ctx.config.directory_url().to_string(),
        status: trainer.status,
    }))
}

/// Admin notice and trainer confirmation. Failures are only logged.
async fn send_registration_notifications(ctx: &AppContext, trainer: &NewTrainer, trainer_id: i64) {
    let data = json!({
        "trainer_id": trainer_id,
        "first_name": trainer.first_name,
        "last_name": trainer.last_name,
        "email": trainer.email,
        "phone": trainer.phone,
        "company": trainer.company,
        "specialties": trainer.specialties_joined(),
        "intervention_regions": trainer.regions_joined(),
        "experience_level": trainer.experience_level.as_str(),
        "status": trainer.status.as_str(),
    });

    if ctx.config.settings.notifications.notify_new_registration {
        let sent = ctx
            .email
            .send_template_email(
                EmailTemplate::AdminNewTrainer.key(),
                ctx.config.notification_email(),
                &data,
                None,
            )
            .await;
        if !sent {
            app_log!(warn, "Admin notification for trainer #{} not sent", trainer_id);
        }
    }

    let template = match trainer.status {
        TrainerStatus::Approved => EmailTemplate::TrainerApproved,
        _ => EmailTemplate::RegistrationConfirmation,
    };
    let sent = ctx
        .email
        .send_template_email(template.key(), &trainer.email, &data, None)
        .await;
    if !sent {
        app_log!(warn, "Confirmation for trainer #{} not sent", trainer_id);
    }
}
