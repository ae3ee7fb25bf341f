// src/web/mod.rs
pub mod handlers;
pub mod types;

pub use types::*;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::fs::NamedFile;
use rocket::http::{Header, Status};
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};

use crate::app_log;
use crate::core::AppContext;

// CORS Fairing
pub struct Cors {
    allowed_origin: String,
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new(
            "Access-Control-Allow-Origin",
            self.allowed_origin.clone(),
        ));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

// API routes

#[get("/nonce")]
pub async fn nonce(
    ctx: &State<AppContext>,
) -> Result<Json<NonceResponse>, Json<StandardErrorResponse>> {
    handlers::nonce_handler(ctx.inner()).await
}

#[post("/submit_trainer_registration", data = "<form>")]
pub async fn submit_trainer_registration(
    form: Form<RegistrationForm<'_>>,
    ctx: &State<AppContext>,
) -> Result<Json<RegistrationResponse>, Json<StandardErrorResponse>> {
    handlers::submit_registration_handler(form, ctx.inner()).await
}

#[post("/search_trainers", data = "<form>")]
pub async fn search_trainers(
    form: Form<SearchForm>,
    ctx: &State<AppContext>,
) -> Result<Json<SearchResponse>, Json<StandardErrorResponse>> {
    handlers::search_trainers_handler(form, ctx.inner()).await
}

#[post("/advanced_search_trainers", data = "<form>")]
pub async fn advanced_search_trainers(
    form: Form<AdvancedSearchForm>,
    ctx: &State<AppContext>,
) -> Result<Json<AdvancedSearchResponse>, Json<StandardErrorResponse>> {
    handlers::advanced_search_handler(form, ctx.inner()).await
}

#[post("/get_trainer_profile", data = "<form>")]
pub async fn get_trainer_profile(
    form: Form<ProfileForm>,
    ctx: &State<AppContext>,
) -> Result<Json<ProfileResponse>, Json<StandardErrorResponse>> {
    handlers::trainer_profile_handler(form, ctx.inner()).await
}

#[post("/contact_trainer", data = "<form>")]
pub async fn contact_trainer(
    form: Form<ContactForm>,
    client: ClientInfo,
    ctx: &State<AppContext>,
) -> Result<Json<ContactResponse>, Json<StandardErrorResponse>> {
    handlers::contact_trainer_handler(form, client, ctx.inner()).await
}

#[get("/health")]
pub async fn health(ctx: &State<AppContext>) -> Json<HealthResponse> {
    handlers::health_handler(ctx.inner()).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Public pages

#[get("/directory?<page>")]
pub async fn directory(page: Option<i64>, ctx: &State<AppContext>) -> RawHtml<String> {
    handlers::directory_handler(page, ctx.inner()).await
}

#[get("/uploads/photos/<file>")]
pub async fn photo(file: &str, ctx: &State<AppContext>) -> Result<NamedFile, Status> {
    handlers::photo_handler(file, ctx.inner()).await
}

// Error catchers. The AJAX clients only read the body, so failures keep HTTP 200.

fn caught(message: &str, code: &str) -> (Status, Json<StandardErrorResponse>) {
    (Status::Ok, Json(StandardErrorResponse::new(message, code)))
}

#[rocket::catch(400)]
pub fn bad_request() -> (Status, Json<StandardErrorResponse>) {
    caught("Requête invalide", "bad_request")
}

#[rocket::catch(413)]
pub fn payload_too_large() -> (Status, Json<StandardErrorResponse>) {
    caught(
        "Erreur lors de l'upload: Fichier trop volumineux",
        "payload_too_large",
    )
}

#[rocket::catch(422)]
pub fn unprocessable() -> (Status, Json<StandardErrorResponse>) {
    caught("Données invalides. Veuillez corriger les erreurs.", "unprocessable")
}

#[rocket::catch(500)]
pub fn internal_error() -> (Status, Json<StandardErrorResponse>) {
    caught("Erreur serveur. Veuillez réessayer.", "internal_error")
}

/// Assemble the server around an already built context.
pub fn build_rocket(ctx: AppContext) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", 8.mebibytes())
        .limit("data-form", 10.mebibytes())
        .limit("form", 64.kibibytes());

    let figment = rocket::Config::figment()
        .merge(("port", ctx.config.settings.port))
        .merge(("limits", limits));

    let cors = Cors {
        allowed_origin: ctx.config.settings.allowed_origin.clone(),
    };

    rocket::custom(figment)
        .attach(cors)
        .manage(ctx)
        .register(
            "/",
            catchers![bad_request, payload_too_large, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                nonce,
                submit_trainer_registration,
                search_trainers,
                advanced_search_trainers,
                get_trainer_profile,
                contact_trainer,
                health,
                options,
            ],
        )
        .mount("/", routes![directory, photo])
}

// Main server start function
pub async fn start_web_server(ctx: AppContext) -> Result<()> {
    app_log!(info, "Starting trainer directory API server");
    app_log!(info, "Database: {}", ctx.config.settings.database_path.display());
    app_log!(info, "Uploads: {}", ctx.config.settings.uploads_path.display());
    app_log!(info, "Server: http://0.0.0.0:{}", ctx.config.settings.port);

    let _rocket = build_rocket(ctx)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed: {}", e))?;

    Ok(())
}
