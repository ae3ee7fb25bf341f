// src/web/handlers/search_handlers.rs
use rocket::form::Form;
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;

use super::verify_nonce;
use crate::app_log;
use crate::core::AppContext;
use crate::render::{card_for, directory_page, profile_for, render_cards};
use crate::search::{clamp_page, search_trainers, SearchCriteria, DEFAULT_PER_PAGE};
use crate::types::TrainerCard;
use crate::web::types::{
    AdvancedSearchForm, AdvancedSearchResponse, ProfileForm, ProfileResponse, SearchForm,
    SearchResponse, StandardErrorResponse,
};

fn cards(ctx: &AppContext, trainers: &[crate::types::Trainer]) -> Vec<TrainerCard> {
    let base_url = &ctx.config.settings.uploads_base_url;
    trainers
        .iter()
        .map(|trainer| card_for(trainer, ctx.files.as_ref(), base_url))
        .collect()
}

fn search_failure() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new("Erreur lors de la recherche", "search_error"))
}

pub async fn search_trainers_handler(
    form: Form<SearchForm>,
    ctx: &AppContext,
) -> Result<Json<SearchResponse>, Json<StandardErrorResponse>> {
    verify_nonce(ctx, &form.nonce)?;

    let criteria = form.criteria();
    let page = clamp_page(form.page);

    let result = search_trainers(ctx.datastore.as_ref(), &criteria, page, DEFAULT_PER_PAGE)
        .await
        .map_err(|e| {
            app_log!(error, "Trainer search failed: {:#}", e);
            search_failure()
        })?;

    let cards = cards(ctx, &result.trainers);
    let html = render_cards(&cards);

    app_log!(
        debug,
        "Search returned {} of {} trainers (page {})",
        cards.len(),
        result.pagination.total,
        page
    );

    Ok(Json(SearchResponse::new(
        cards,
        html,
        result.pagination,
        criteria.applied(),
    )))
}

pub async fn advanced_search_handler(
    form: Form<AdvancedSearchForm>,
    ctx: &AppContext,
) -> Result<Json<AdvancedSearchResponse>, Json<StandardErrorResponse>> {
    verify_nonce(ctx, &form.nonce)?;

    let params = form.params();
    let result = search_trainers(
        ctx.datastore.as_ref(),
        &params.criteria(),
        params.page,
        params.per_page,
    )
    .await
    .map_err(|e| {
        app_log!(error, "Advanced trainer search failed: {:#}", e);
        search_failure()
    })?;

    Ok(Json(AdvancedSearchResponse {
        success: true,
        trainers: cards(ctx, &result.trainers),
        total: result.pagination.total,
        page: result.pagination.current_page,
        per_page: result.pagination.per_page,
        total_pages: result.pagination.total_pages,
        search_params: params,
    }))
}

pub async fn trainer_profile_handler(
    form: Form<ProfileForm>,
    ctx: &AppContext,
) -> Result<Json<ProfileResponse>, Json<StandardErrorResponse>> {
    verify_nonce(ctx, &form.nonce)?;

    let trainer_id = match form.trainer_id {
        Some(id) if id > 0 => id,
        _ => {
            return Err(Json(StandardErrorResponse::new(
                "ID formateur manquant",
                "missing_trainer_id",
            )))
        }
    };

    let trainer = match ctx.datastore.find_approved(trainer_id).await {
        Ok(Some(trainer)) => trainer,
        Ok(None) => {
            return Err(Json(StandardErrorResponse::new(
                "Formateur non trouvé",
                "trainer_not_found",
            )))
        }
        Err(e) => {
            app_log!(error, "Profile lookup for #{} failed: {:#}", trainer_id, e);
            return Err(Json(StandardErrorResponse::new(
                "Erreur lors du chargement du profil",
                "database_error",
            )));
        }
    };

    Ok(Json(ProfileResponse {
        success: true,
        profile: profile_for(
            &trainer,
            ctx.files.as_ref(),
            &ctx.config.settings.uploads_base_url,
        ),
    }))
}

/// Static listing of approved trainers, same cards as the live search.
pub async fn directory_handler(page: Option<i64>, ctx: &AppContext) -> RawHtml<String> {
    let page = clamp_page(page);
    let title = format!("Annuaire des formateurs - {}", ctx.config.settings.site.name);

    match search_trainers(
        ctx.datastore.as_ref(),
        &SearchCriteria::default(),
        page,
        DEFAULT_PER_PAGE,
    )
    .await
    {
        Ok(result) => {
            let cards = cards(ctx, &result.trainers);
            RawHtml(directory_page(
                &title,
                &cards,
                page,
                result.pagination.total_pages,
            ))
        }
        Err(e) => {
            app_log!(error, "Directory listing failed: {:#}", e);
            RawHtml(directory_page(&title, &[], page, 0))
        }
    }
}
