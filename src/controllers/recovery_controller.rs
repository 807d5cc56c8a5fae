use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tracing::error;

use crate::service::recovery_service::{RecoveryError, RecoveryService};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeRequest {
    pub phone_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub phone_number: String,
    pub code: String,
    pub new_password: String,
}

pub async fn request_code(
    service: web::Data<RecoveryService>,
    request: web::Json<RequestCodeRequest>,
) -> impl Responder {
    match service.request_code(request.phone_number.trim()).await {
        Ok(reference) => HttpResponse::Ok().json(serde_json::json!({
            "deliveryReference": reference.provider_id,
        })),
        Err(err) => error_response(err),
    }
}

pub async fn verify_code(
    service: web::Data<RecoveryService>,
    request: web::Json<VerifyCodeRequest>,
) -> impl Responder {
    match service
        .verify_code(request.phone_number.trim(), request.code.trim())
        .await
    {
        Ok(ack) => HttpResponse::Ok().json(serde_json::json!({
            "acknowledged": true,
            "expiresAt": ack.expires_at,
        })),
        Err(err) => error_response(err),
    }
}

pub async fn reset_password(
    service: web::Data<RecoveryService>,
    request: web::Json<ResetPasswordRequest>,
) -> impl Responder {
    match service
        .reset_password(
            request.phone_number.trim(),
            request.code.trim(),
            &request.new_password,
        )
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
        })),
        Err(err) => error_response(err),
    }
}

/// Maps the closed error taxonomy onto HTTP. Account-existence and delivery
/// failures share one message so the endpoint does not reveal which numbers
/// are registered.
fn error_response(err: RecoveryError) -> HttpResponse {
    let body = |message: &str| serde_json::json!({ "error": message });
    match err {
        RecoveryError::AccountNotFound => {
            HttpResponse::BadRequest().json(body("We could not send a code to this phone number"))
        }
        RecoveryError::DeliveryFailed(cause) if cause.is_permanent() => {
            HttpResponse::BadGateway().json(body("We could not send a code to this phone number"))
        }
        RecoveryError::DeliveryFailed(_) => HttpResponse::ServiceUnavailable()
            .json(body("We could not send the code right now, please try again")),
        RecoveryError::RateLimited => HttpResponse::TooManyRequests()
            .json(body("Please wait a minute before requesting another code")),
        RecoveryError::InvalidFormat => {
            HttpResponse::BadRequest().json(body("The code must be exactly 6 digits"))
        }
        RecoveryError::CodeNotFound | RecoveryError::CodeExpired => {
            HttpResponse::BadRequest().json(body("Invalid or expired code"))
        }
        RecoveryError::SamePassword => {
            HttpResponse::BadRequest().json(body("New password must differ from the current one"))
        }
        RecoveryError::WeakPassword => {
            HttpResponse::BadRequest().json(body("Password must be at least 6 characters"))
        }
        RecoveryError::Infrastructure(report) => {
            error!(error = ?report, "recovery request failed");
            HttpResponse::InternalServerError().json(body("Something went wrong, please try again"))
        }
    }
}
