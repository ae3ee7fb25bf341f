// src/render.rs
//! Directory card markup, shared by the static listing and live search.

use crate::core::fs_ops::FileStore;
use crate::types::{Trainer, TrainerCard, TrainerProfile};
use crate::utils::{escape_html, humanize_first, humanize_words};

const PLACEHOLDER_NAME: &str = "Formateur Expert";
const VISIBLE_TAGS: usize = 2;

/// `"D. Marie"` for Marie Dupont; a generic label when a part is missing.
pub fn anonymize(last_name: &str, first_name: &str) -> String {
    let (last_name, first_name) = (last_name.trim(), first_name.trim());
    let Some(initial) = last_name.chars().next() else {
        return PLACEHOLDER_NAME.to_string();
    };
    if first_name.is_empty() {
        return PLACEHOLDER_NAME.to_string();
    }

    format!("{}. {}", initial.to_uppercase(), first_name)
}

/// Public URL of a stored photo, only when the file is actually on disk.
fn photo_url(trainer: &Trainer, files: &dyn FileStore, base_url: &str) -> Option<String> {
    if trainer.photo_file.is_empty() {
        return None;
    }
    files
        .resolve(&trainer.photo_file)
        .filter(|path| path.exists())
        .map(|_| format!("{}/{}", base_url.trim_end_matches('/'), trainer.photo_file))
}

pub fn card_for(trainer: &Trainer, files: &dyn FileStore, base_url: &str) -> TrainerCard {
    TrainerCard {
        id: trainer.id,
        display_name: anonymize(&trainer.last_name, &trainer.first_name),
        company: trainer.company.clone(),
        specialties: trainer.specialty_list(),
        intervention_regions: trainer.region_list(),
        experience_level: trainer.experience_level,
        availability: trainer.availability.clone(),
        hourly_rate: trainer.hourly_rate.clone(),
        photo_url: photo_url(trainer, files, base_url),
        cv_available: trainer.has_cv(),
        created_at: trainer.created_at,
    }
}

pub fn profile_for(trainer: &Trainer, files: &dyn FileStore, base_url: &str) -> TrainerProfile {
    TrainerProfile {
        id: trainer.id,
        display_name: anonymize(&trainer.last_name, &trainer.first_name),
        company: trainer.company.clone(),
        specialties: trainer.specialty_list(),
        intervention_regions: trainer.region_list(),
        experience_level: trainer.experience_level,
        availability: trainer.availability.clone(),
        hourly_rate: trainer.hourly_rate.clone(),
        experience: trainer.experience.clone(),
        bio: trainer.bio.clone(),
        linkedin_url: trainer.linkedin_url.clone(),
        created_at: trainer.created_at,
        photo_url: photo_url(trainer, files, base_url).unwrap_or_default(),
        cv_available: trainer.has_cv(),
    }
}

pub fn render_cards(cards: &[TrainerCard]) -> String {
    if cards.is_empty() {
        return empty_state();
    }
    cards.iter().map(render_card).collect()
}

pub fn render_card(card: &TrainerCard) -> String {
    let reference = format!("{:04}", card.id);
    let id_attr = escape_html(&card.id.to_string());
    let name = escape_html(&card.display_name);
    let mut html = String::new();

    html.push_str(&format!(
        r#"<article class="trpro-trainer-card-compact" data-trainer-id="{}">"#,
        id_attr
    ));

    html.push_str(r#"<div class="trpro-card-header"><div class="trpro-trainer-avatar">"#);
    html.push_str(
        r#"<div class="trpro-avatar-placeholder"><i class="fas fa-user-graduate"></i></div>"#,
    );
    if let Some(photo_url) = &card.photo_url {
        html.push_str(&format!(
            r#"<img src="{}" alt="Photo formateur #{}" loading="lazy" onload="this.previousElementSibling.style.display='none';" onerror="this.style.display='none'; this.previousElementSibling.style.display='flex';">"#,
            escape_html(photo_url),
            reference
        ));
    }
    html.push_str("</div>");

    html.push_str(r#"<div class="trpro-status-badges">"#);
    html.push_str(r#"<span class="trpro-badge trpro-verified" title="Profil vérifié"><i class="fas fa-check-circle"></i></span>"#);
    if card.cv_available {
        html.push_str(r#"<span class="trpro-badge trpro-cv-available" title="CV disponible"><i class="fas fa-file-pdf"></i></span>"#);
    }
    html.push_str("</div></div>");

    html.push_str(r#"<div class="trpro-card-body">"#);
    html.push_str(&format!(
        r#"<h3 class="trpro-trainer-name">{}<span class="trpro-trainer-id">#{}</span></h3>"#,
        name, reference
    ));

    if !card.company.is_empty() {
        html.push_str(&format!(
            r#"<div class="trpro-company"><i class="fas fa-building"></i>{}</div>"#,
            escape_html(&card.company)
        ));
    }

    html.push_str(r#"<div class="trpro-specialties">"#);
    for specialty in card.specialties.iter().take(VISIBLE_TAGS) {
        html.push_str(&format!(
            r#"<span class="trpro-specialty-tag">{}</span>"#,
            escape_html(&humanize_first(specialty))
        ));
    }
    if card.specialties.len() > VISIBLE_TAGS {
        html.push_str(&format!(
            r#"<span class="trpro-specialty-tag trpro-more">+{}</span>"#,
            card.specialties.len() - VISIBLE_TAGS
        ));
    }
    html.push_str("</div>");

    if !card.intervention_regions.is_empty() {
        let shown = card
            .intervention_regions
            .iter()
            .take(VISIBLE_TAGS)
            .map(|region| humanize_words(region))
            .collect::<Vec<_>>()
            .join(", ");
        html.push_str(r#"<div class="trpro-regions"><i class="fas fa-map-marker-alt"></i>"#);
        html.push_str(&escape_html(&shown));
        if card.intervention_regions.len() > VISIBLE_TAGS {
            html.push_str(&format!(
                r#" <span class="trpro-more-regions">+{}</span>"#,
                card.intervention_regions.len() - VISIBLE_TAGS
            ));
        }
        html.push_str("</div>");
    }

    html.push_str(r#"<div class="trpro-meta">"#);
    if !card.availability.is_empty() {
        html.push_str(&format!(
            r#"<span class="trpro-meta-item"><i class="fas fa-calendar-check"></i>{}</span>"#,
            escape_html(&humanize_first(&card.availability))
        ));
    }
    // the rate stays off the public card
    html.push_str("</div></div>");

    html.push_str(r#"<div class="trpro-card-footer">"#);
    html.push_str(&format!(
        r#"<button class="trpro-btn trpro-btn-primary trpro-btn-contact" data-trainer-id="{}" data-trainer-name="{}" title="Contacter ce formateur"><i class="fas fa-envelope"></i>Contact</button>"#,
        id_attr, name
    ));
    html.push_str(&format!(
        r#"<button class="trpro-btn trpro-btn-outline trpro-btn-profile" data-trainer-id="{}" title="Voir le profil détaillé"><i class="fas fa-user"></i>Profil</button>"#,
        id_attr
    ));
    html.push_str("</div></article>");

    html
}

pub fn empty_state() -> String {
    r#"
<div class="trpro-empty-state">
  <div class="trpro-empty-icon"><i class="fas fa-users"></i></div>
  <h3>Aucun formateur trouvé</h3>
  <p>Essayez de modifier vos critères de recherche ou explorez d'autres spécialités.</p>
  <button class="trpro-btn trpro-btn-primary" onclick="window.TrainerFilters?.resetAllFilters()">
    <i class="fas fa-refresh"></i>
    Réinitialiser les filtres
  </button>
</div>
"#
    .to_string()
}

/// Full page for the static listing, using the same cards as live search.
pub fn directory_page(title: &str, cards: &[TrainerCard], page: i64, total_pages: i64) -> String {
    let mut nav = String::new();
    if page > 1 {
        nav.push_str(&format!(
            r#"<a class="trpro-btn trpro-btn-outline" href="?page={}">Précédent</a>"#,
            page - 1
        ));
    }
    if total_pages > 0 {
        nav.push_str(&format!(
            r#"<span class="trpro-page-indicator">Page {} / {}</span>"#,
            page, total_pages
        ));
    }
    if page < total_pages {
        nav.push_str(&format!(
            r#"<a class="trpro-btn trpro-btn-outline" href="?page={}">Suivant</a>"#,
            page + 1
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body>
  <main class="trpro-directory">
    <h1>{title}</h1>
    <div class="trpro-trainers-grid">{cards}</div>
    <nav class="trpro-pagination">{nav}</nav>
  </main>
</body>
</html>"#,
        title = escape_html(title),
        cards = render_cards(cards),
        nav = nav,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs_ops::LocalFileStore;
    use crate::types::ExperienceLevel;
    use chrono::Utc;

    fn card(specialties: &[&str], regions: &[&str]) -> TrainerCard {
        TrainerCard {
            id: 7,
            display_name: "D. Marie".to_string(),
            company: String::new(),
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
            intervention_regions: regions.iter().map(|s| s.to_string()).collect(),
            experience_level: ExperienceLevel::Senior,
            availability: "temps-partiel".to_string(),
            hourly_rate: "65€".to_string(),
            photo_url: None,
            cv_available: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymize() {
        assert_eq!(anonymize("Dupont", "Marie"), "D. Marie");
        assert_eq!(anonymize("émile", "Jean"), "É. Jean");
        assert_eq!(anonymize("", "X"), "Formateur Expert");
        assert_eq!(anonymize("Dupont", " "), "Formateur Expert");
    }

    #[test]
    fn test_four_specialties_render_two_tags_and_overflow() {
        let html = render_card(&card(&["rust", "devops", "kubernetes", "go"], &[]));

        assert_eq!(html.matches(r#"<span class="trpro-specialty-tag">"#).count(), 2);
        assert!(html.contains(r#"<span class="trpro-specialty-tag trpro-more">+2</span>"#));
        assert!(html.contains(">Rust<"));
        assert!(!html.contains("Kubernetes"));
    }

    #[test]
    fn test_card_layout() {
        let html = render_card(&card(&["rust"], &["ile-de-france", "bretagne", "alsace"]));

        assert!(html.starts_with(r#"<article class="trpro-trainer-card-compact" data-trainer-id="7">"#));
        assert!(html.contains(r#"D. Marie<span class="trpro-trainer-id">#0007</span>"#));
        assert!(html.contains("Ile De France, Bretagne"));
        assert!(html.contains(r#"<span class="trpro-more-regions">+1</span>"#));
        assert!(html.contains("trpro-cv-available"));
        assert!(html.contains("Temps partiel"));
        assert!(!html.contains("trpro-more\">"));
        assert!(!html.contains("65€"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_empty_list_renders_empty_state() {
        let html = render_cards(&[]);
        assert!(html.contains("trpro-empty-state"));
        assert!(html.contains("resetAllFilters"));
    }

    #[test]
    fn test_photo_url_requires_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/p.png"), b"x").unwrap();

        let mut trainer = Trainer {
            id: 3,
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            email: "m@x.fr".to_string(),
            phone: String::new(),
            company: String::new(),
            linkedin_url: String::new(),
            specialties: "rust, devops".to_string(),
            intervention_regions: String::new(),
            experience: String::new(),
            experience_level: ExperienceLevel::Expert,
            availability: String::new(),
            hourly_rate: String::new(),
            hourly_rate_value: 0,
            bio: String::new(),
            cv_file: String::new(),
            photo_file: "photos/p.png".to_string(),
            rgpd_consent: true,
            marketing_consent: false,
            status: crate::types::TrainerStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let card = card_for(&trainer, &store, "/uploads/");
        assert_eq!(card.photo_url.as_deref(), Some("/uploads/photos/p.png"));
        assert!(!card.cv_available);

        trainer.photo_file = "photos/missing.png".to_string();
        assert_eq!(card_for(&trainer, &store, "/uploads").photo_url, None);
        assert_eq!(profile_for(&trainer, &store, "/uploads").photo_url, "");
    }
}
