use std::str::FromStr;

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use log::{error, info};
use serde_json::json;

use shared::{AnalyzeRequest, SensorUpdate, SprayCommand, SprayCommandRequest, SprayCommandResponse};

use crate::config::SystemConfig;
use crate::pipeline::AnalysisPipeline;
use crate::sensors::SensorHub;
use crate::spray::SprayController;
use crate::vision::EngineError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/analyze").route(web::post().to(analyze)))
        .service(web::resource("/sensors").route(web::get().to(get_sensors)))
        .service(web::resource("/sensors/update").route(web::post().to(update_sensors)))
        .service(web::resource("/control/spray").route(web::post().to(control_spray)))
        .service(web::resource("/control/status").route(web::get().to(spray_status)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Leaf Disease Analysis & Spray Control API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /analyze - Analyze leaf image",
            "GET /sensors - Get sensor readings",
            "POST /sensors/update - Update sensor data from IoT",
            "POST /control/spray - Control spray pump",
            "GET /control/status - Spray system status"
        ]
    }))
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "success": false, "error": message }))
}

fn validate_moisture(reading: f32) -> Result<f32, HttpResponse> {
    if reading.is_finite() && (0.0..=100.0).contains(&reading) {
        Ok(reading)
    } else {
        Err(bad_request("soil_moisture must be a percentage within 0-100"))
    }
}

fn engine_error_response(err: &EngineError) -> HttpResponse {
    let body = json!({ "success": false, "error": err.to_string() });
    match err {
        EngineError::InvalidImage(_) => HttpResponse::BadRequest().json(body),
        EngineError::ModelUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        EngineError::Timeout(_) => HttpResponse::GatewayTimeout().json(body),
        EngineError::Aborted => HttpResponse::InternalServerError().json(body),
    }
}

/// Image + moisture extracted from either request encoding.
struct AnalyzeInput {
    image: Vec<u8>,
    soil_moisture: Option<f32>,
}

async fn read_multipart(mut payload: Multipart) -> Result<AnalyzeInput, HttpResponse> {
    let mut image = Vec::new();
    let mut soil_moisture = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| bad_request(&format!("malformed multipart body: {e}")))?;
        let name = field.name().unwrap_or("").to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| bad_request(&format!("failed to read field: {e}")))?;
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "soil_moisture" => {
                let text = String::from_utf8(data)
                    .map_err(|_| bad_request("soil_moisture must be a number"))?;
                let value = text
                    .trim()
                    .parse::<f32>()
                    .map_err(|_| bad_request("soil_moisture must be a number"))?;
                soil_moisture = Some(value);
            }
            _ => {
                if !data.is_empty() {
                    image = data;
                }
            }
        }
    }

    if image.is_empty() {
        return Err(bad_request("no image provided"));
    }
    Ok(AnalyzeInput {
        image,
        soil_moisture,
    })
}

async fn read_json(mut payload: web::Payload) -> Result<AnalyzeInput, HttpResponse> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| bad_request(&format!("failed to read body: {e}")))?;
        body.extend_from_slice(&chunk);
    }

    let request: AnalyzeRequest = serde_json::from_slice(&body)
        .map_err(|e| bad_request(&format!("malformed analyze request: {e}")))?;
    let image = BASE64
        .decode(request.image_base64.as_bytes())
        .map_err(|_| bad_request("image_base64 is not valid base64"))?;
    if image.is_empty() {
        return Err(bad_request("no image provided"));
    }

    Ok(AnalyzeInput {
        image,
        soil_moisture: request.soil_moisture,
    })
}

/// Accepts a leaf image as multipart form data (`image` file field plus an
/// optional `soil_moisture` text field) or as JSON with a base64 payload.
/// Missing moisture falls back to the latest sensor snapshot.
async fn analyze(
    req: HttpRequest,
    payload: web::Payload,
    pipeline: web::Data<AnalysisPipeline>,
    sensors: web::Data<SensorHub>,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let input = if content_type.starts_with("multipart/") {
        read_multipart(Multipart::new(req.headers(), payload)).await
    } else {
        read_json(payload).await
    };
    let input = match input {
        Ok(input) => input,
        Err(response) => return response,
    };

    let soil_moisture = match input.soil_moisture {
        Some(reading) => match validate_moisture(reading) {
            Ok(reading) => reading,
            Err(response) => return response,
        },
        None => sensors.latest_moisture().await,
    };

    match pipeline.analyze(input.image, soil_moisture).await {
        Ok(report) => {
            info!(
                "Analysis {}: severity {} at {:.1}% infection, spray {}s (recommended: {})",
                report.analysis_id,
                report.severity,
                report.infection_level,
                report.spray_duration,
                report.spray_recommended
            );
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            error!("Analysis failed: {e}");
            engine_error_response(&e)
        }
    }
}

async fn get_sensors(sensors: web::Data<SensorHub>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": sensors.snapshot().await
    }))
}

async fn update_sensors(
    sensors: web::Data<SensorHub>,
    body: web::Json<SensorUpdate>,
) -> HttpResponse {
    if let Some(reading) = body.soil_moisture {
        if let Err(response) = validate_moisture(reading) {
            return response;
        }
    }
    let snapshot = sensors.apply(body.into_inner()).await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Sensor data updated",
        "data": snapshot
    }))
}

/// Manual pump control. Bypasses the analysis pipeline but NOT the safety
/// gate: START passes through the same moisture check as scan-driven
/// recommendations.
async fn control_spray(
    body: web::Json<SprayCommandRequest>,
    pipeline: web::Data<AnalysisPipeline>,
    config: web::Data<SystemConfig>,
    controller: web::Data<SprayController>,
    sensors: web::Data<SensorHub>,
) -> HttpResponse {
    let command = match SprayCommand::from_str(&body.command) {
        Ok(command) => command,
        Err(_) => return bad_request("Invalid command. Use START or STOP"),
    };

    let soil_moisture = match body.soil_moisture {
        Some(reading) => match validate_moisture(reading) {
            Ok(reading) => reading,
            Err(response) => return response,
        },
        None => sensors.latest_moisture().await,
    };

    match command {
        SprayCommand::Start => {
            if let Err(violation) = pipeline.moisture_band().check(soil_moisture) {
                controller.record_rejection().await;
                info!("Manual spray rejected: {violation}");
                return HttpResponse::Forbidden().json(SprayCommandResponse {
                    success: false,
                    command: "REJECTED".to_string(),
                    spray_allowed: false,
                    duration: None,
                    soil_moisture,
                    message: format!("cannot spray: {violation}"),
                });
            }

            let duration = body
                .duration
                .unwrap_or(config.policy.default_manual_duration);
            controller.record_start(duration).await;
            info!("Manual spray started for {duration}s");
            HttpResponse::Ok().json(SprayCommandResponse {
                success: true,
                command: "START_SPRAY".to_string(),
                spray_allowed: true,
                duration: Some(duration),
                soil_moisture,
                message: format!("Spray started for {duration} seconds"),
            })
        }
        SprayCommand::Stop => {
            controller.record_stop().await;
            info!("Manual spray stopped");
            HttpResponse::Ok().json(SprayCommandResponse {
                success: true,
                command: "STOP_SPRAY".to_string(),
                spray_allowed: true,
                duration: None,
                soil_moisture,
                message: "Spray stopped".to_string(),
            })
        }
    }
}

async fn spray_status(controller: web::Data<SprayController>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "spray_status": controller.status().await
    }))
}
