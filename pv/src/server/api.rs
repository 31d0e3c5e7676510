//! Request handlers
//!
//! Each handler validates its input, then adapts the request to a stage, the
//! pipeline or the image client. Validation always runs before the credential
//! check, so a bad request gets a 400 even on a server without an API key.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::ApiError;
use super::state::SharedState;
use crate::images::{self, DecodedImage, ImageError};
use crate::llm::ContentPart;
use crate::persona::PersonaDocument;
use crate::stages::{Stage, StageResult};

const NO_PROMPT_GENERATED: &str = "No prompt generated.";
const NO_IMAGES_GENERATED: &str = "Failed to generate any images";
const IMAGE_TRANSPORT_FAILURE: &str = "Failed to process image generation request";
const STUDIO_IMAGES_REQUIRED: &str = "Product image and template image are required";

// ── Extractor ─────────────────────────────────────────────────────────

/// `Json` whose rejections (bad syntax, wrong content type, wrong shape) become 400s
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// ── Request / response types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreferencesRequest {
    preferences: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhotoPromptRequest {
    product_image: Option<String>,
    reference_image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageRequest {
    prompt: Option<String>,
    num_outputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudioPhotoRequest {
    product_image: Option<String>,
    template_image: Option<String>,
    prompt: Option<String>,
    num_outputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ItineraryRequest {
    query: Option<String>,
    persona: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    image_url: Option<String>,
    image_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudioPhotoResponse {
    success: bool,
    image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItineraryResponse {
    run_id: Uuid,
    itinerary: String,
    stages: Vec<StageResult>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/master", post(master))
        .route("/historian", post(historian))
        .route("/tour-guide", post(tour_guide))
        .route("/itinerary-planner", post(itinerary_planner))
        .route("/itinerary", post(itinerary))
        .route("/generatePrompt", post(generate_prompt))
        .route("/generateImage", post(generate_image))
        .route("/generate-studio-photo", post(generate_studio_photo))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// A present, non-blank string field
fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

/// Read `numOutputs` (number or numeric string, default 1) and clamp it
fn parse_num_outputs(value: Option<&Value>) -> Result<u8, ApiError> {
    let invalid = || ApiError::Validation("numOutputs must be a number".to_string());
    let requested = match value {
        None | Some(Value::Null) => 1,
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    Ok(images::clamp_outputs(requested))
}

async fn run_stage(state: &SharedState, stage: Stage, input: String, generic: &str) -> Result<String, ApiError> {
    debug!(%stage, input_len = input.len(), "run_stage: called");
    let backend = state.backend()?;
    backend
        .runner()
        .run_direct(stage, &input)
        .await
        .map_err(|e| ApiError::from(e).or_generic(generic))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn master(State(state): State<SharedState>, JsonBody(body): JsonBody<QueryRequest>) -> Result<Json<Value>, ApiError> {
    let query = required(body.query, "Missing query")?;
    let itinerary = run_stage(&state, Stage::Master, query, "Error generating itinerary").await?;
    Ok(Json(serde_json::json!({ "itinerary": itinerary })))
}

async fn historian(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let query = required(body.query, "Missing query for historical information")?;
    let history = run_stage(&state, Stage::Historian, query, "Error retrieving historical information").await?;
    Ok(Json(serde_json::json!({ "history": history })))
}

async fn tour_guide(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<PreferencesRequest>,
) -> Result<Json<Value>, ApiError> {
    let preferences = required(body.preferences, "Missing preferences for tour recommendations")?;
    let recommendations =
        run_stage(&state, Stage::TourGuide, preferences, "Error generating tour recommendations").await?;
    Ok(Json(serde_json::json!({ "recommendations": recommendations })))
}

async fn itinerary_planner(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let query = required(body.query, "Missing query")?;
    let itinerary = run_stage(&state, Stage::ItineraryPlanner, query, "Error generating itinerary").await?;
    Ok(Json(serde_json::json!({ "itinerary": itinerary })))
}

/// Run the whole pipeline for one query
async fn itinerary(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<ItineraryRequest>,
) -> Result<Json<ItineraryResponse>, ApiError> {
    let query = required(body.query, "Missing query")?;
    let backend = state.backend()?;
    let orchestrator = &backend.orchestrator;

    let run = match body.persona.filter(|p| !p.trim().is_empty()) {
        Some(persona) => {
            debug!("itinerary: using request persona");
            orchestrator
                .run_with_persona(&query, &PersonaDocument::new(persona))
                .await
        }
        None => orchestrator.run(&query).await,
    };

    let itinerary = run.outcome().map_err(|e| ApiError::Upstream(e.to_string()))?.to_string();
    info!(run_id = %run.id, "Itinerary generated");
    Ok(Json(ItineraryResponse {
        run_id: run.id,
        itinerary,
        stages: run.results,
    }))
}

/// Ask the photo director for a generation prompt from two reference images
async fn generate_prompt(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<PhotoPromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let missing = "Missing product or reference image";
    let product = required(body.product_image, missing)?;
    let reference = required(body.reference_image, missing)?;
    let backend = state.backend()?;

    let system = state.prompts.photo_director_system.render(&[])?;
    let instruction = state.prompts.photo_director_user.render(&[])?;
    let parts = vec![
        ContentPart::text(instruction),
        ContentPart::image_url(product),
        ContentPart::image_url(reference),
    ];

    let prompt = backend
        .completion
        .complete_parts(&system, parts, backend.options, NO_PROMPT_GENERATED)
        .await
        .map_err(|e| ApiError::from(e).or_generic("Error generating photography prompt"))?;
    Ok(Json(serde_json::json!({ "prompt": prompt })))
}

/// Generate 1-4 images; several are requested concurrently, one call each
async fn generate_image(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<GenerateImageRequest>,
) -> Result<Json<ImageResponse>, ApiError> {
    let prompt = required(body.prompt, "Missing prompt")?;
    let count = parse_num_outputs(body.num_outputs.as_ref())?;
    let backend = state.backend()?;
    let wrapped = images::preservation_prompt(&state.prompts, &prompt)?;
    debug!(%count, "generate_image: called");

    let urls = if count > 1 {
        let batch = images::generate_many(&backend.images, &wrapped, count).await;
        if !batch.errors.is_empty() {
            warn!(
                failed = batch.errors.len(),
                succeeded = batch.urls.len(),
                first_error = %batch.errors[0],
                "generate_image: some generations failed"
            );
        }
        batch.urls
    } else {
        match backend.images.generate(&wrapped).await {
            Ok(url) => url.into_iter().collect(),
            Err(ImageError::ApiError { message, .. }) => {
                return Err(ApiError::Remote {
                    status: Some(400),
                    message,
                });
            }
            Err(e) => {
                debug!(error = %e, "generate_image: generation failed");
                return Err(ApiError::Internal(IMAGE_TRANSPORT_FAILURE.to_string()));
            }
        }
    };

    if urls.is_empty() {
        return Err(ApiError::Remote {
            status: Some(400),
            message: NO_IMAGES_GENERATED.to_string(),
        });
    }

    info!(count = urls.len(), "Images generated");
    Ok(Json(ImageResponse {
        image_url: urls.first().cloned(),
        image_urls: urls,
    }))
}

/// Compose a studio photo from a product image and a style template image
async fn generate_studio_photo(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<StudioPhotoRequest>,
) -> Result<Json<StudioPhotoResponse>, ApiError> {
    let product = required(body.product_image, STUDIO_IMAGES_REQUIRED)?;
    let template = required(body.template_image, STUDIO_IMAGES_REQUIRED)?;
    let count = parse_num_outputs(body.num_outputs.as_ref())?;
    let images = vec![
        DecodedImage::from_data_url(&product)?,
        DecodedImage::from_data_url(&template)?,
    ];
    let backend = state.backend()?;

    let prompt = images::studio_prompt(&state.prompts, body.prompt.as_deref())?;
    let b64 = backend.images.edit(images, &prompt, count).await?;

    Ok(Json(StudioPhotoResponse {
        success: true,
        image_url: images::png_data_url(&b64),
    }))
}
