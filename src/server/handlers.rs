use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

use super::{multipart::GenerateForm, AppState};
use crate::{
    error::{Result, StagingError},
    imaging::{check_image_source, cover_resize_jpeg, encode_data_uri, image_dimensions},
    models::{ErrorResponse, GenerateResponse, GenerationRequest, PipelineResult, RefineRequest},
};

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "demoMode": state.pipeline.is_demo(),
    }))
}

pub async fn list_styles(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.catalog.style_entries())
}

pub async fn list_room_types(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.catalog.room_type_entries())
}

/// POST /api/generate - stage an uploaded room photo
pub async fn generate(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let outcome = match GenerateForm::read(payload, state.max_upload_bytes)
        .await
        .and_then(GenerateForm::into_request)
    {
        Ok(request) => {
            log::info!(
                "[{}] 🏠 Staging request: style={} room={} ({} bytes)",
                request_id,
                request.style_id,
                request.room_type_id,
                request.image_bytes.len()
            );
            stage_upload(&state, &request).await
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result_url) => {
            log::info!(
                "[{}] ✅ Staging finished in {:.1}s",
                request_id,
                started.elapsed().as_secs_f64()
            );
            HttpResponse::Ok().json(GenerateResponse { result_url })
        }
        Err(err) => error_response(&request_id, "Failed to generate image", err),
    }
}

/// POST /api/refine - apply a free-text correction to a staged image
pub async fn refine(state: web::Data<AppState>, body: web::Json<RefineRequest>) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();
    let request = body.into_inner();
    log::info!("[{}] ✏️  Refine request: {}", request_id, request.prompt);

    match refine_image(&state, &request).await {
        Ok(result_url) => HttpResponse::Ok().json(GenerateResponse { result_url }),
        Err(err) => error_response(&request_id, "Failed to refine image", err),
    }
}

async fn stage_upload(state: &AppState, request: &GenerationRequest) -> Result<String> {
    let style = state.catalog.style(&request.style_id)?;
    let room = state.catalog.room_type(&request.room_type_id)?;
    let custom_prompt = request.custom_prompt.as_deref();

    if state.pipeline.is_demo() {
        let result = state.pipeline.stage("", style, room, custom_prompt).await?;
        return Ok(result.url().to_string());
    }

    let (width, height) = image_dimensions(&request.image_bytes).map_err(unreadable_input)?;
    let mime_type = request
        .content_type
        .as_deref()
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or("image/jpeg");
    let image_uri = encode_data_uri(&request.image_bytes, mime_type);

    let result = state
        .pipeline
        .stage(&image_uri, style, room, custom_prompt)
        .await?;
    fit_to_original(state, result, width, height).await
}

async fn refine_image(state: &AppState, request: &RefineRequest) -> Result<String> {
    if request.image_url.trim().is_empty() || request.prompt.trim().is_empty() {
        return Err(StagingError::Validation(
            "Missing required fields: imageUrl, prompt".into(),
        ));
    }
    check_image_source(&request.image_url, &state.allowed_image_hosts)?;
    if state.pipeline.is_demo() {
        let result = state.pipeline.refine(&request.image_url, &request.prompt).await?;
        return Ok(result.url().to_string());
    }

    let original = state
        .pipeline
        .fetch_image(&request.image_url)
        .await
        .map_err(unreadable_input)?;
    let (width, height) = image_dimensions(&original).map_err(unreadable_input)?;
    let result = state.pipeline.refine(&request.image_url, &request.prompt).await?;
    fit_to_original(state, result, width, height).await
}

/// Download the pipeline output and return it as a JPEG data URI of exactly `width`x`height`.
async fn fit_to_original(
    state: &AppState,
    result: PipelineResult,
    width: u32,
    height: u32,
) -> Result<String> {
    if result.is_demo() {
        return Ok(result.url().to_string());
    }

    let bytes = state.pipeline.fetch_image(result.url()).await?;
    let quality = state.output_quality;
    let jpeg = web::block(move || cover_resize_jpeg(&bytes, width, height, quality))
        .await
        .map_err(|e| StagingError::Internal(format!("resize task failed: {}", e)))??;
    Ok(encode_data_uri(&jpeg, "image/jpeg"))
}

/// Client-supplied images that cannot be read are the caller's problem.
fn unreadable_input(err: StagingError) -> StagingError {
    match err {
        StagingError::Image(message) => {
            StagingError::Validation(format!("Unsupported or unreadable image: {}", message))
        }
        other => other,
    }
}

fn error_response(request_id: &str, context: &str, err: StagingError) -> HttpResponse {
    if err.is_client_error() {
        log::warn!("[{}] ⚠️  Rejected request: {}", request_id, err);
        let message = match err {
            StagingError::Validation(message) => message,
            other => other.to_string(),
        };
        return HttpResponse::BadRequest().json(ErrorResponse { error: message });
    }

    log::error!("[{}] ❌ {}: {}", request_id, context, err);
    log::debug!("[{}] error detail: {:?}", request_id, err);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: format!("{}: {}", context, err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, RetryConfig};
    use crate::imaging::{decode_data_uri, transform::test_jpeg};
    use crate::models::{Catalog, ModelOutput};
    use crate::pipeline::{demo_image, StagingPipeline};
    use crate::replicate::{model_client::tests::ScriptedRunner, ModelClient};
    use crate::server::configure;
    use crate::test_support::{LoopbackServer, Reply};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use std::sync::Arc;
    use std::time::Duration;

    const BOUNDARY: &str = "----rstage-test-boundary";

    fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            if *name == "image" {
                body.extend_from_slice(
                    b"Content-Disposition: form-data; name=\"image\"; filename=\"room.jpg\"\r\n\
Content-Type: image/jpeg\r\n\r\n",
                );
            } else {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn generate_request(fields: &[(&str, &[u8])]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/generate")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(fields))
    }

    fn fast_pipeline_config() -> PipelineConfig {
        PipelineConfig::default().with_pauses(Duration::ZERO, Duration::from_millis(10))
    }

    fn demo_state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Catalog::builtin(),
            StagingPipeline::demo(fast_pipeline_config()),
        ))
    }

    fn live_state(runner: Arc<ScriptedRunner>) -> web::Data<AppState> {
        let client = ModelClient::new(runner, RetryConfig::immediate(4));
        web::Data::new(AppState::new(
            Catalog::builtin(),
            StagingPipeline::new(client, fast_pipeline_config()),
        ))
    }

    #[actix_web::test]
    async fn test_demo_mode_returns_canned_room_image() {
        let app = test::init_service(App::new().app_data(demo_state()).configure(configure)).await;

        let req = generate_request(&[
            ("image", b"whatever the user uploaded".as_slice()),
            ("style", b"scandinavian".as_slice()),
            ("roomType", b"bedroom".as_slice()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: GenerateResponse = test::read_body_json(resp).await;
        assert_eq!(body.result_url, demo_image("bedroom"));
    }

    #[actix_web::test]
    async fn test_missing_room_type_is_bad_request_without_model_calls() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        let jpeg = test_jpeg(32, 32);
        let req = generate_request(&[("image", jpeg.as_slice()), ("style", b"modern".as_slice())]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("roomType"));
        assert_eq!(runner.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_unknown_style_is_bad_request() {
        let app = test::init_service(App::new().app_data(demo_state()).configure(configure)).await;

        let req = generate_request(&[
            ("image", b"bytes".as_slice()),
            ("style", b"art-deco".as_slice()),
            ("roomType", b"bedroom".as_slice()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("art-deco"));
    }

    #[actix_web::test]
    async fn test_result_is_resized_to_upload_dimensions() {
        let model_image = |w, h| ModelOutput::plain(encode_data_uri(&test_jpeg(w, h), "image/jpeg"));
        let runner = Arc::new(ScriptedRunner::new(vec![
            Ok(model_image(640, 640)),
            Ok(model_image(512, 384)),
            Ok(model_image(1024, 1024)),
        ]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        let upload = test_jpeg(1200, 800);
        let req = generate_request(&[
            ("image", upload.as_slice()),
            ("style", b"industrial".as_slice()),
            ("roomType", b"living-room".as_slice()),
            ("customPrompt", b"keep the fireplace".as_slice()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: GenerateResponse = test::read_body_json(resp).await;
        let (bytes, mime) = decode_data_uri(&body.result_url).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(image_dimensions(&bytes).unwrap(), (1200, 800));
        assert_eq!(runner.call_count(), 3);
    }

    #[actix_web::test]
    async fn test_model_failure_is_server_error() {
        let runner = Arc::new(ScriptedRunner::new(vec![Err(StagingError::Response(
            "prediction failed: input_image unreadable".into(),
        ))]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        let upload = test_jpeg(64, 48);
        let req = generate_request(&[
            ("image", upload.as_slice()),
            ("style", b"classic".as_slice()),
            ("roomType", b"dining".as_slice()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Failed to generate image:"));
        assert!(body.error.contains("input_image unreadable"));
    }

    #[actix_web::test]
    async fn test_refine_requires_prompt() {
        let app = test::init_service(App::new().app_data(demo_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "imageUrl": "https://img/staged.jpg", "prompt": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_refine_resizes_back_to_input() {
        let runner = Arc::new(ScriptedRunner::new(vec![Ok(ModelOutput::File {
            url: encode_data_uri(&test_jpeg(500, 500), "image/jpeg"),
        })]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        let staged = encode_data_uri(&test_jpeg(300, 200), "image/jpeg");
        let req = test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "imageUrl": staged, "prompt": "add a plant in the corner" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: GenerateResponse = test::read_body_json(resp).await;
        let (bytes, _) = decode_data_uri(&body.result_url).unwrap();
        assert_eq!(image_dimensions(&bytes).unwrap(), (300, 200));
    }

    #[actix_web::test]
    async fn test_refine_rejects_internal_image_url_without_fetching() {
        let internal = LoopbackServer::start(|_| {
            vec![Reply::bytes(200, "image/jpeg", test_jpeg(8, 8))]
        })
        .await;
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        for image_url in [
            internal.url("/internal/admin-secret"),
            "http://169.254.169.254/latest/meta-data/".to_string(),
            "file:///etc/passwd".to_string(),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/refine")
                .set_json(json!({ "imageUrl": image_url, "prompt": "remove the rug" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", image_url);

            let body: ErrorResponse = test::read_body_json(resp).await;
            assert!(body.error.contains("imageUrl"));
        }
        assert!(internal.requests().is_empty());
        assert_eq!(runner.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_unreadable_upload_is_bad_request() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let app = test::init_service(
            App::new()
                .app_data(live_state(runner.clone()))
                .configure(configure),
        )
        .await;

        let req = generate_request(&[
            ("image", b"%PDF-1.4 not an image".as_slice()),
            ("style", b"modern".as_slice()),
            ("roomType", b"office".as_slice()),
        ])
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.starts_with("Unsupported or unreadable image"));
        assert_eq!(runner.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_catalog_listings_and_health() {
        let app = test::init_service(App::new().app_data(demo_state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/styles").to_request();
        let styles: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(styles.len(), 6);

        let req = test::TestRequest::get().uri("/api/room-types").to_request();
        let rooms: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(rooms.iter().any(|room| room["id"] == "hallway"));

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health["demoMode"], true);
    }
}
