use actix_web::error::InternalError;
use actix_web::web::JsonConfig;
use actix_web::HttpResponse;
use paperclip::actix::web;

use crate::api::ErrorResponse;
use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api/v1").service(
                web::scope("/books")
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::get_all_books))
                            .route(web::post().to(handlers::create_book)),
                    )
                    .service(
                        web::resource("/{book_id}")
                            .route(web::get().to(handlers::get_book))
                            .route(web::put().to(handlers::update_book))
                            .route(web::delete().to(handlers::delete_book)),
                    ),
            ),
        );
}

/// Answers undecodable request bodies with 400 and the decoder message
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected request body {}", err);
        let response = HttpResponse::BadRequest().json(ErrorResponse {
            error: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    })
}
