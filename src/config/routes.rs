use actix_web::web;

use crate::controllers::recovery_controller;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/api/recovery/request-code",
        web::post().to(recovery_controller::request_code),
    )
    .route(
        "/api/recovery/verify-code",
        web::post().to(recovery_controller::verify_code),
    )
    .route(
        "/api/recovery/reset-password",
        web::post().to(recovery_controller::reset_password),
    );
}
