// src/email/templates.rs
//! HTML bodies of the notification emails.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::utils::{escape_html, escape_html_multiline};

/// Values shared by every template that do not come from the caller's data.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub company_name: String,
    pub contact_email: String,
    pub admin_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    RegistrationConfirmation,
    TrainerApproved,
    TrainerRejected,
    AdminNewTrainer,
    ContactRequest,
    WeeklySummary,
    PendingReminder,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 7] = [
        Self::RegistrationConfirmation,
        Self::TrainerApproved,
        Self::TrainerRejected,
        Self::AdminNewTrainer,
        Self::ContactRequest,
        Self::WeeklySummary,
        Self::PendingReminder,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmation => "trainer_registration_confirmation",
            Self::TrainerApproved => "trainer_approved",
            Self::TrainerRejected => "trainer_rejected",
            Self::AdminNewTrainer => "admin_new_trainer",
            Self::ContactRequest => "trainer_contact_request",
            Self::WeeklySummary => "weekly_summary",
            Self::PendingReminder => "pending_reminder",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|template| template.key() == key)
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmation => {
                "Confirmation de votre inscription - Plateforme Formateurs IT"
            }
            Self::TrainerApproved => "Félicitations ! Votre candidature a été approuvée",
            Self::TrainerRejected => "Mise à jour de votre candidature",
            Self::AdminNewTrainer => "Nouvelle inscription formateur - Action requise",
            Self::ContactRequest => "Nouvelle demande de contact",
            Self::WeeklySummary => "Résumé hebdomadaire - Plateforme Formateurs",
            Self::PendingReminder => "Formateurs en attente de validation",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RegistrationConfirmation => {
                "Confirmation sent to a trainer right after registration"
            }
            Self::TrainerApproved => "Sent when a trainer is approved",
            Self::TrainerRejected => "Sent when a trainer is rejected",
            Self::AdminNewTrainer => "Admin notification for a new registration",
            Self::ContactRequest => "Contact request relayed to the team",
            Self::WeeklySummary => "Weekly activity digest",
            Self::PendingReminder => "Reminder about trainers waiting for review",
        }
    }

    /// Render the body from already sanitised data.
    pub fn render(&self, data: &Map<String, Value>, ctx: &TemplateContext) -> String {
        match self {
            Self::RegistrationConfirmation => registration_confirmation(data, ctx),
            Self::TrainerApproved => trainer_approved(data, ctx),
            Self::TrainerRejected => trainer_rejected(data, ctx),
            Self::AdminNewTrainer => admin_new_trainer(data, ctx),
            Self::ContactRequest => contact_request(data),
            Self::WeeklySummary => weekly_summary(data, ctx),
            Self::PendingReminder => pending_reminder(data, ctx),
        }
    }
}

/// Replace `{{key}}` with the escaped string or number under `key`.
pub fn parse_template_vars(text: &str, data: &Map<String, Value>) -> String {
    let mut out = text.to_string();
    for (key, value) in data {
        let replacement = match value {
            Value::String(s) => escape_html(s),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        out = out.replace(&format!("{{{{{}}}}}", key), &replacement);
    }
    out
}

/// Escaped text of a string or number field, if non-empty.
fn text(data: &Map<String, Value>, key: &str) -> Option<String> {
    let raw = match data.get(key)? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(escape_html(&raw))
}

fn int(data: &Map<String, Value>, key: &str) -> i64 {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn contact_button(contact_email: &str, color: &str) -> String {
    format!(
        "<a href='mailto:{}' style='background: {}; color: white; padding: 12px 24px; border-radius: 6px; text-decoration: none; font-weight: 600;'>Nous contacter</a>",
        escape_html(contact_email),
        color
    )
}

fn registration_confirmation(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    let trainer_name = text(data, "first_name").unwrap_or_else(|| "Formateur".to_string());
    let steps = [
        ("#10b981", "Vérification de votre profil et documents"),
        ("#f59e0b", "Validation par notre équipe sous 48h"),
        ("#6366f1", "Activation de votre profil formateur"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (color, label))| {
        format!(
            "<div style='display: flex; align-items: center; margin-bottom: 12px;'>\
             <span style='width: 24px; height: 24px; background: {}; border-radius: 50%; color: white; text-align: center; margin-right: 12px; font-size: 12px;'>{}</span>\
             <span style='color: #4b5563;'>{}</span></div>",
            color,
            i + 1,
            label
        )
    })
    .collect::<String>();

    format!(
        r#"
<div style='background: #f8fafc; padding: 40px 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 12px; overflow: hidden;'>
    <div style='background: linear-gradient(135deg, #6366f1, #8b5cf6); padding: 40px; text-align: center; color: white;'>
      <h1 style='margin: 0; font-size: 28px;'>Bienvenue {name} !</h1>
      <p style='margin: 16px 0 0 0; font-size: 18px;'>Votre inscription a été reçue avec succès</p>
    </div>
    <div style='padding: 40px;'>
      <h2 style='color: #1f2937; text-align: center;'>Inscription Confirmée</h2>
      <p style='color: #6b7280; text-align: center;'>Nous examinons actuellement votre candidature</p>
      <div style='background: #f9fafb; border-radius: 8px; padding: 24px; margin: 32px 0;'>
        <h3 style='color: #374151; margin: 0 0 16px 0;'>Prochaines étapes :</h3>
        {steps}
      </div>
      <div style='text-align: center;'>
        <p style='color: #6b7280;'>En attendant, n'hésitez pas à nous contacter pour toute question</p>
        {button}
      </div>
    </div>
    <div style='background: #f9fafb; padding: 24px; text-align: center; border-top: 1px solid #e5e7eb;'>
      <p style='margin: 0; color: #6b7280; font-size: 14px;'>
        Cet email a été envoyé par {company}<br>
        Si vous n'êtes pas à l'origine de cette inscription, veuillez ignorer cet email.
      </p>
    </div>
  </div>
</div>"#,
        name = trainer_name,
        steps = steps,
        button = contact_button(&ctx.contact_email, "#6366f1"),
        company = escape_html(&ctx.company_name),
    )
}

fn trainer_approved(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    let trainer_name = text(data, "first_name").unwrap_or_else(|| "Formateur".to_string());
    let perks = [
        "Visibilité auprès de recruteurs qualifiés",
        "Accès prioritaire aux missions de formation",
        "Support dédié pour vos candidatures",
        "Réseau d'experts pour échanger",
    ]
    .iter()
    .map(|perk| format!("<li style='margin-bottom: 8px;'>{}</li>", perk))
    .collect::<String>();

    format!(
        r#"
<div style='background: #f0fdf4; padding: 40px 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 12px; overflow: hidden;'>
    <div style='background: linear-gradient(135deg, #10b981, #059669); padding: 40px; text-align: center; color: white;'>
      <h1 style='margin: 0; font-size: 28px;'>Félicitations {name} !</h1>
      <p style='margin: 16px 0 0 0; font-size: 18px;'>Votre candidature a été approuvée</p>
    </div>
    <div style='padding: 40px;'>
      <h2 style='color: #1f2937; text-align: center;'>Bienvenue dans notre réseau !</h2>
      <p style='color: #6b7280; line-height: 1.6;'>
        Votre profil de formateur expert est maintenant actif sur notre plateforme.
        Les recruteurs peuvent désormais consulter vos compétences et vous contacter
        pour des opportunités de formation.
      </p>
      <div style='background: #f0fdf4; border: 1px solid #bbf7d0; border-radius: 8px; padding: 24px; margin: 32px 0;'>
        <h3 style='color: #065f46; margin: 0 0 16px 0;'>Avantages de votre adhésion :</h3>
        <ul style='color: #047857; margin: 0; padding-left: 20px;'>{perks}</ul>
      </div>
      <div style='text-align: center;'>{button}</div>
    </div>
    <div style='background: #f9fafb; padding: 24px; text-align: center; border-top: 1px solid #e5e7eb;'>
      <p style='margin: 0; color: #6b7280; font-size: 14px;'>Merci de faire partie de notre réseau d'excellence !</p>
    </div>
  </div>
</div>"#,
        name = trainer_name,
        perks = perks,
        button = contact_button(&ctx.contact_email, "#10b981"),
    )
}

fn trainer_rejected(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    let trainer_name = text(data, "first_name").unwrap_or_else(|| "Formateur".to_string());
    let reason = text(data, "rejection_reason")
        .map(|reason| {
            format!(
                "<div style='background: #fef3c7; border: 1px solid #fcd34d; border-radius: 8px; padding: 20px; margin-bottom: 24px;'>\
                 <h3 style='color: #92400e; margin: 0 0 12px 0;'>Motif :</h3>\
                 <p style='color: #a16207; margin: 0;'>{}</p></div>",
                reason
            )
        })
        .unwrap_or_default();

    format!(
        r#"
<div style='background: #fef2f2; padding: 40px 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 12px; overflow: hidden;'>
    <div style='background: linear-gradient(135deg, #f59e0b, #d97706); padding: 40px; text-align: center; color: white;'>
      <h1 style='margin: 0; font-size: 28px;'>Mise à jour de votre candidature</h1>
      <p style='margin: 16px 0 0 0; font-size: 18px;'>Bonjour {name}</p>
    </div>
    <div style='padding: 40px;'>
      <p style='color: #6b7280; line-height: 1.6; margin-bottom: 24px;'>
        Nous vous remercions pour l'intérêt que vous portez à notre plateforme de formateurs.
        Après examen de votre candidature, nous ne pouvons malheureusement pas
        l'accepter en l'état actuel.
      </p>
      {reason}
      <div style='background: #f0f9ff; border: 1px solid #7dd3fc; border-radius: 8px; padding: 20px; margin-bottom: 24px;'>
        <h3 style='color: #0c4a6e; margin: 0 0 12px 0;'>Vous pouvez :</h3>
        <ul style='color: #0369a1; margin: 0; padding-left: 20px;'>
          <li>Compléter votre profil avec plus d'informations</li>
          <li>Ajouter des certifications récentes</li>
          <li>Mettre à jour votre CV avec vos dernières expériences</li>
          <li>Nous recontacter dans quelques mois</li>
        </ul>
      </div>
      <div style='text-align: center;'>
        <p style='color: #6b7280;'>N'hésitez pas à nous contacter pour plus d'informations</p>
        {button}
      </div>
    </div>
    <div style='background: #f9fafb; padding: 24px; text-align: center; border-top: 1px solid #e5e7eb;'>
      <p style='margin: 0; color: #6b7280; font-size: 14px;'>Merci pour votre compréhension.</p>
    </div>
  </div>
</div>"#,
        name = trainer_name,
        reason = reason,
        button = contact_button(&ctx.contact_email, "#f59e0b"),
    )
}

fn admin_new_trainer(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    let trainer_name = match (text(data, "first_name"), text(data, "last_name")) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        _ => "Nouveau formateur".to_string(),
    };
    let trainer_id = int(data, "trainer_id");
    let trainer_id_display = if trainer_id > 0 {
        trainer_id.to_string()
    } else {
        String::new()
    };

    let rows = [
        ("Email", text(data, "email").unwrap_or_default()),
        ("Téléphone", text(data, "phone").unwrap_or_default()),
        ("Spécialités", text(data, "specialties").unwrap_or_default()),
        ("Zones", text(data, "intervention_regions").unwrap_or_default()),
        ("Statut", text(data, "status").unwrap_or_default()),
    ]
    .iter()
    .map(|(label, value)| {
        format!(
            "<tr><td style='padding: 8px 0; color: #6b7280; width: 120px; vertical-align: top;'>{} :</td>\
             <td style='padding: 8px 0; color: #1f2937;'>{}</td></tr>",
            label, value
        )
    })
    .collect::<String>();

    let admin_url = escape_html(&ctx.admin_url);

    format!(
        r#"
<div style='background: #f8fafc; padding: 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 8px;'>
    <div style='background: #6366f1; color: white; padding: 24px; border-radius: 8px 8px 0 0;'>
      <h1 style='margin: 0; font-size: 24px;'>Nouvelle inscription formateur</h1>
      <p style='margin: 8px 0 0 0;'>Action requise</p>
    </div>
    <div style='padding: 24px;'>
      <div style='background: #fef3c7; border-left: 4px solid #f59e0b; padding: 16px; margin-bottom: 24px;'>
        <p style='margin: 0; color: #92400e; font-weight: 600;'>Un nouveau formateur attend votre validation</p>
      </div>
      <h2 style='color: #1f2937; margin: 0 0 16px 0;'>{name}</h2>
      <div style='background: #f9fafb; padding: 16px; border-radius: 6px; margin-bottom: 20px;'>
        <table style='width: 100%; border-collapse: collapse;'>
          <tr><td style='padding: 8px 0; color: #6b7280; width: 120px;'>ID :</td>
          <td style='padding: 8px 0; color: #1f2937; font-weight: 600;'>#{id}</td></tr>
          {rows}
        </table>
      </div>
      <div style='text-align: center; margin: 32px 0;'>
        <a href='{admin_url}?action=view&amp;trainer_id={id}' style='background: #10b981; color: white; padding: 14px 28px; border-radius: 6px; text-decoration: none; font-weight: 600; margin-right: 12px;'>Examiner le profil</a>
        <a href='{admin_url}' style='background: #6b7280; color: white; padding: 14px 28px; border-radius: 6px; text-decoration: none; font-weight: 600;'>Voir tous les formateurs</a>
      </div>
    </div>
  </div>
</div>"#,
        name = trainer_name,
        id = trainer_id_display,
        rows = rows,
        admin_url = admin_url,
    )
}

fn contact_request(data: &Map<String, Value>) -> String {
    let trainer_name = text(data, "trainer_name").unwrap_or_else(|| "Formateur".to_string());
    let contact_name = text(data, "contact_name").unwrap_or_default();
    let contact_email = text(data, "contact_email").unwrap_or_default();
    let company = text(data, "contact_company")
        .map(|company| {
            format!(
                "<tr><td style='padding: 8px 0; color: #6b7280;'>Entreprise :</td>\
                 <td style='padding: 8px 0; color: #1f2937;'>{}</td></tr>",
                company
            )
        })
        .unwrap_or_default();
    let message = text(data, "contact_message")
        .map(|message| {
            format!(
                "<div style='background: #f0f9ff; border: 1px solid #7dd3fc; border-radius: 8px; padding: 20px; margin-bottom: 24px;'>\
                 <h3 style='color: #0c4a6e; margin: 0 0 12px 0;'>Message :</h3>\
                 <div style='color: #0369a1; line-height: 1.6;'>{}</div></div>",
                message
            )
        })
        .unwrap_or_default();

    format!(
        r#"
<div style='background: #f8fafc; padding: 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 8px;'>
    <div style='background: #059669; color: white; padding: 24px; border-radius: 8px 8px 0 0;'>
      <h1 style='margin: 0; font-size: 24px;'>Nouvelle demande de contact</h1>
      <p style='margin: 8px 0 0 0;'>Pour le formateur {trainer}</p>
    </div>
    <div style='padding: 24px;'>
      <div style='background: #f9fafb; padding: 16px; border-radius: 6px; margin-bottom: 20px;'>
        <h3 style='color: #374151; margin: 0 0 12px 0;'>Informations du demandeur :</h3>
        <table style='width: 100%; border-collapse: collapse;'>
          <tr><td style='padding: 8px 0; color: #6b7280; width: 120px;'>Nom :</td>
          <td style='padding: 8px 0; color: #1f2937; font-weight: 600;'>{name}</td></tr>
          <tr><td style='padding: 8px 0; color: #6b7280;'>Email :</td>
          <td style='padding: 8px 0; color: #1f2937;'>{email}</td></tr>
          {company}
        </table>
      </div>
      {message}
      <div style='text-align: center; margin: 32px 0;'>
        <p style='color: #6b7280;'>Répondez directement à cet email pour mettre en relation.</p>
        <a href='mailto:{email}' style='background: #059669; color: white; padding: 14px 28px; border-radius: 6px; text-decoration: none; font-weight: 600;'>Répondre par email</a>
      </div>
    </div>
  </div>
</div>"#,
        trainer = trainer_name,
        name = contact_name,
        email = contact_email,
        company = company,
        message = message,
    )
}

fn weekly_summary(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    let tiles = [
        ("#f0f9ff", "#1d4ed8", int(data, "new_registrations"), "Nouvelles inscriptions"),
        ("#f0fdf4", "#059669", int(data, "approved_this_week"), "Formateurs approuvés"),
        ("#fef3c7", "#d97706", int(data, "pending_total"), "En attente"),
    ]
    .iter()
    .map(|(background, color, count, label)| {
        format!(
            "<td style='background: {}; padding: 16px; border-radius: 8px; text-align: center;'>\
             <div style='font-size: 32px; font-weight: 700; color: {};'>{}</div>\
             <div style='color: #6b7280; font-size: 14px;'>{}</div></td>",
            background, color, count, label
        )
    })
    .collect::<String>();

    format!(
        r#"
<div style='background: #f8fafc; padding: 20px;'>
  <div style='max-width: 600px; margin: 0 auto; background: white; border-radius: 8px;'>
    <div style='background: #6366f1; color: white; padding: 24px; border-radius: 8px 8px 0 0;'>
      <h1 style='margin: 0; font-size: 24px;'>Résumé hebdomadaire</h1>
      <p style='margin: 8px 0 0 0;'>Activité de la semaine</p>
    </div>
    <div style='padding: 24px;'>
      <table style='width: 100%; border-spacing: 16px 0; margin-bottom: 24px;'><tr>{tiles}</tr></table>
      <div style='text-align: center;'>
        <a href='{admin_url}' style='background: #6366f1; color: white; padding: 14px 28px; border-radius: 6px; text-decoration: none; font-weight: 600;'>Voir le tableau de bord</a>
      </div>
    </div>
  </div>
</div>"#,
        tiles = tiles,
        admin_url = escape_html(&ctx.admin_url),
    )
}

fn pending_reminder(data: &Map<String, Value>, ctx: &TemplateContext) -> String {
    format!(
        r#"
<div style='background: #fef3c7; padding: 20px; border-radius: 8px; border: 1px solid #fcd34d;'>
  <h2 style='color: #92400e; margin: 0 0 16px 0;'>Formateurs en attente</h2>
  <p style='color: #a16207; margin: 0 0 16px 0;'>
    Vous avez <strong>{count} formateur(s)</strong> en attente de validation depuis plus de 7 jours.
  </p>
  <a href='{admin_url}?status_filter=pending' style='background: #f59e0b; color: white; padding: 12px 24px; border-radius: 6px; text-decoration: none; font-weight: 600;'>Traiter maintenant</a>
</div>"#,
        count = int(data, "pending_count"),
        admin_url = escape_html(&ctx.admin_url),
    )
}

/// Full HTML document around a body fragment.
pub fn wrap_email_content(content: &str, subject: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{subject}</title>
  <style>
    body {{ margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #333; }}
    .email-container {{ max-width: 600px; margin: 0 auto; }}
    @media only screen and (max-width: 600px) {{ .email-container {{ width: 100% !important; }} }}
  </style>
</head>
<body>
  <div class="email-container">
{content}
  </div>
</body>
</html>"#,
        subject = escape_html(subject),
        content = content,
    )
}

/// Fields of the message relayed to the team for a contact request.
#[derive(Debug, Clone)]
pub struct ContactNotice<'a> {
    pub trainer_display_name: &'a str,
    pub trainer_reference: &'a str,
    pub trainer_specialties: &'a str,
    pub trainer_regions: &'a str,
    pub requester_name: &'a str,
    pub requester_email: &'a str,
    pub requester_company: &'a str,
    pub message: &'a str,
    pub site_url: &'a str,
    pub requester_ip: &'a str,
    pub sent_at: DateTime<Utc>,
}

/// Complete HTML document sent to the contact address.
pub fn contact_team_email(notice: &ContactNotice<'_>) -> String {
    let trainer_name = escape_html(notice.trainer_display_name);
    let email = escape_html(notice.requester_email);
    let company = if notice.requester_company.is_empty() {
        String::new()
    } else {
        format!(
            "<p><strong>Entreprise:</strong> {}</p>",
            escape_html(notice.requester_company)
        )
    };
    let regions = if notice.trainer_regions.is_empty() {
        String::new()
    } else {
        format!(
            "<p><strong>Zones:</strong> {}</p>",
            escape_html(notice.trainer_regions)
        )
    };

    format!(
        r#"<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background: #2563eb; color: white; padding: 20px; border-radius: 8px 8px 0 0; }}
    .content {{ padding: 20px; background: #f8fafc; border: 1px solid #e2e8f0; }}
    .info-box {{ background: white; padding: 15px; margin: 10px 0; border-left: 4px solid #2563eb; border-radius: 4px; }}
    .footer {{ padding: 15px; text-align: center; color: #64748b; font-size: 12px; background: #f1f5f9; border-radius: 0 0 8px 8px; }}
  </style>
</head>
<body>
  <div class='container'>
    <div class='header'>
      <h2>Nouvelle Demande de Contact</h2>
      <p>Formateur: {trainer} (#{reference})</p>
    </div>
    <div class='content'>
      <div class='info-box'>
        <h3>Demandeur</h3>
        <p><strong>Nom:</strong> {name}</p>
        <p><strong>Email:</strong> <a href='mailto:{email}'>{email}</a></p>
        {company}
      </div>
      <div class='info-box'>
        <h3>Formateur Concerné</h3>
        <p><strong>Nom:</strong> {trainer}</p>
        <p><strong>Spécialités:</strong> {specialties}</p>
        {regions}
      </div>
      <div class='info-box'>
        <h3>Message</h3>
        <div style='background: #fff; padding: 10px; border-radius: 4px;'>{message}</div>
      </div>
      <div style='text-align: center; margin: 20px 0;'>
        <a href='mailto:{email}?subject=RE: Demande de formation - {trainer}' style='background: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;'>Répondre au Demandeur</a>
      </div>
    </div>
    <div class='footer'>
      <p>Email envoyé le {date} depuis {site}</p>
      <p>IP: {ip}</p>
    </div>
  </div>
</body>
</html>"#,
        trainer = trainer_name,
        reference = escape_html(notice.trainer_reference),
        name = escape_html(notice.requester_name),
        email = email,
        company = company,
        specialties = escape_html(notice.trainer_specialties),
        regions = regions,
        message = escape_html_multiline(notice.message),
        date = notice.sent_at.format("%d/%m/%Y à %H:%M"),
        site = escape_html(notice.site_url),
        ip = escape_html(notice.requester_ip),
    )
}

/// Body fragment confirming receipt to the requester.
pub fn contact_confirmation_email(
    requester_name: &str,
    trainer_display_name: &str,
    ctx: &TemplateContext,
) -> String {
    format!(
        r#"
<div style='max-width: 500px; margin: 0 auto; padding: 20px; font-family: Arial, sans-serif;'>
  <div style='background: #10b981; color: white; padding: 20px; text-align: center; border-radius: 8px 8px 0 0;'>
    <h2>Demande Reçue !</h2>
  </div>
  <div style='padding: 20px; background: #f0fdf4; border: 1px solid #bbf7d0; border-radius: 0 0 8px 8px;'>
    <p>Bonjour <strong>{name}</strong>,</p>
    <p>Votre demande concernant le formateur <strong>{trainer}</strong> a été transmise à notre équipe.</p>
    <div style='background: white; padding: 15px; border-radius: 5px; margin: 15px 0; border-left: 4px solid #10b981;'>
      <p><strong>Délai de réponse :</strong> 24-48h ouvrées</p>
      <p><strong>Contact direct :</strong> {contact}</p>
    </div>
    <p>Cordialement,<br>L'équipe {company}</p>
  </div>
</div>"#,
        name = escape_html(requester_name),
        trainer = escape_html(trainer_display_name),
        contact = escape_html(&ctx.contact_email),
        company = escape_html(&ctx.company_name),
    )
}

/// Body of the operator's delivery test.
pub fn test_email_body(now: DateTime<Utc>) -> String {
    format!(
        r#"
<div style="padding: 20px; background: #f8fafc;">
  <div style="max-width: 500px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px;">
    <h2 style="color: #6366f1;">Test Email Réussi !</h2>
    <p>Ceci est un email de test pour vérifier que le système d'envoi fonctionne correctement.</p>
    <p><strong>Heure du test :</strong> {}</p>
    <div style="background: #f0fdf4; padding: 15px; border-radius: 6px; border-left: 4px solid #10b981;">
      <p style="margin: 0; color: #065f46;">Configuration email opérationnelle</p>
    </div>
  </div>
</div>"#,
        now.format("%d/%m/%Y %H:%M:%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> TemplateContext {
        TemplateContext {
            company_name: "Formateurs Pro".to_string(),
            contact_email: "contact@example.com".to_string(),
            admin_url: "https://example.com/admin".to_string(),
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_registry_keys_round_trip() {
        for template in EmailTemplate::ALL {
            assert_eq!(EmailTemplate::from_key(template.key()), Some(template));
            assert!(!template.subject().is_empty());
        }
        assert_eq!(EmailTemplate::from_key("unknown"), None);
    }

    #[test]
    fn test_confirmation_greets_by_first_name() {
        let html = EmailTemplate::RegistrationConfirmation
            .render(&map(json!({"first_name": "Marie"})), &ctx());
        assert!(html.contains("Bienvenue Marie !"));
        assert!(html.contains("mailto:contact@example.com"));

        let html = EmailTemplate::RegistrationConfirmation.render(&Map::new(), &ctx());
        assert!(html.contains("Bienvenue Formateur !"));
    }

    #[test]
    fn test_rejection_reason_is_optional() {
        let with_reason = EmailTemplate::TrainerRejected
            .render(&map(json!({"rejection_reason": "CV incomplet"})), &ctx());
        assert!(with_reason.contains("Motif :"));
        assert!(with_reason.contains("CV incomplet"));

        let without = EmailTemplate::TrainerRejected.render(&Map::new(), &ctx());
        assert!(!without.contains("Motif :"));
    }

    #[test]
    fn test_admin_notice_escapes_values() {
        let html = EmailTemplate::AdminNewTrainer.render(
            &map(json!({
                "first_name": "Marie",
                "last_name": "<Dupont>",
                "trainer_id": 7,
                "email": "marie@example.com"
            })),
            &ctx(),
        );
        assert!(html.contains("Marie &lt;Dupont&gt;"));
        assert!(html.contains("#7"));
        assert!(html.contains("trainer_id=7"));
    }

    #[test]
    fn test_counts_accept_numbers_and_strings() {
        let html = EmailTemplate::PendingReminder.render(&map(json!({"pending_count": "3"})), &ctx());
        assert!(html.contains("<strong>3 formateur(s)</strong>"));

        let html = EmailTemplate::WeeklySummary.render(
            &map(json!({"new_registrations": 4, "approved_this_week": 2, "pending_total": 1})),
            &ctx(),
        );
        assert!(html.contains(">4<"));
        assert!(html.contains(">2<"));
    }

    #[test]
    fn test_parse_template_vars() {
        let out = parse_template_vars(
            "Bonjour {{first_name}} (#{{id}}) {{missing}}",
            &map(json!({"first_name": "<b>Marie</b>", "id": 7, "flag": true})),
        );
        assert_eq!(out, "Bonjour &lt;b&gt;Marie&lt;/b&gt; (#7) {{missing}}");
    }

    #[test]
    fn test_contact_team_email_escapes_message() {
        let html = contact_team_email(&ContactNotice {
            trainer_display_name: "D. Marie",
            trainer_reference: "0007",
            trainer_specialties: "rust, devops",
            trainer_regions: "",
            requester_name: "Paul",
            requester_email: "paul@example.com",
            requester_company: "",
            message: "Bonjour,\n<script>alert(1)</script>",
            site_url: "https://example.com",
            requester_ip: "127.0.0.1",
            sent_at: Utc::now(),
        });

        assert!(html.contains("Formateur: D. Marie (#0007)"));
        assert!(html.contains("Bonjour,<br>\n&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Zones:"));
        assert!(!html.contains("Entreprise:"));
    }

    #[test]
    fn test_wrap_escapes_subject() {
        let html = wrap_email_content("<p>x</p>", "A & B");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("<p>x</p>"));
    }
}
