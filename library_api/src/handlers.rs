use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{Error, FromRequest, HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    BookDetails, BookId, CreateBookResponse, ErrorResponse, GetAllBooksResponse,
    GetBookResponse, HealthResponse, MessageResponse, SERVICE_NAME,
};
use crate::books_service::{BooksService, BooksServiceError};
use crate::request_context::RequestContext;

fn error_response(status: StatusCode, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: message.to_string(),
    })
}

/// Decimal u32 only, signs and whitespace are refused
fn parse_book_id(raw: &str) -> Option<BookId> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}

/// `{book_id}` path segment, rejected with 400 before the body is read
pub struct BookIdPath(BookId);

impl FromRequest for BookIdPath {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            match req.match_info().get("book_id").and_then(parse_book_id) {
                Some(book_id) => Ok(BookIdPath(book_id)),
                None => Err(InternalError::from_response(
                    "Invalid book ID",
                    error_response(StatusCode::BAD_REQUEST, "Invalid book ID"),
                )
                .into()),
            },
        )
    }
}

impl paperclip::v2::schema::Apiv2Schema for BookIdPath {}
impl paperclip::actix::OperationModifier for BookIdPath {}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    }))
}

#[api_v2_operation]
pub async fn create_book(
    books_service: Data<BooksService>,
    ctx: RequestContext,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_service.create_book(&ctx, details.into_inner()).await {
            Ok(book) => HttpResponse::Created().json(CreateBookResponse {
                message: "Book created successfully".to_string(),
                data: book,
            }),
            Err(err) => {
                tracing::error!("Create book failed {}", err);
                error_response(StatusCode::BAD_REQUEST, err)
            }
        },
    )
}

#[api_v2_operation]
pub async fn get_book(
    books_service: Data<BooksService>,
    ctx: RequestContext,
    book_id: BookIdPath,
) -> Result<HttpResponse, Error> {
    let BookIdPath(book_id) = book_id;
    Ok(match books_service.get_book(&ctx, book_id).await {
        Ok(book) => HttpResponse::Ok().json(GetBookResponse { data: book }),
        Err(err @ BooksServiceError::BookNotFound) => error_response(StatusCode::NOT_FOUND, err),
        Err(err) => {
            tracing::error!("Get book failed {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    })
}

#[api_v2_operation]
pub async fn get_all_books(
    books_service: Data<BooksService>,
    ctx: RequestContext,
) -> Result<HttpResponse, Error> {
    Ok(match books_service.get_all_books(&ctx).await {
        Ok(books) => HttpResponse::Ok().json(GetAllBooksResponse {
            count: books.len(),
            data: books,
        }),
        Err(err) => {
            tracing::error!("Get all books failed {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    })
}

#[api_v2_operation]
pub async fn update_book(
    books_service: Data<BooksService>,
    ctx: RequestContext,
    book_id: BookIdPath,
    details: web::Json<BookDetails>,
) -> Result<HttpResponse, Error> {
    let BookIdPath(book_id) = book_id;
    Ok(
        match books_service
            .update_book(&ctx, book_id, details.into_inner())
            .await
        {
            Ok(()) => HttpResponse::Ok().json(MessageResponse {
                message: "Book updated successfully".to_string(),
            }),
            Err(err) => {
                tracing::error!("Update book {} failed {}", book_id, err);
                error_response(StatusCode::BAD_REQUEST, err)
            }
        },
    )
}

#[api_v2_operation]
pub async fn delete_book(
    books_service: Data<BooksService>,
    ctx: RequestContext,
    book_id: BookIdPath,
) -> Result<HttpResponse, Error> {
    let BookIdPath(book_id) = book_id;
    Ok(match books_service.delete_book(&ctx, book_id).await {
        Ok(()) => HttpResponse::Ok().json(MessageResponse {
            message: "Book deleted successfully".to_string(),
        }),
        Err(err @ BooksServiceError::BookNotPresent) => {
            error_response(StatusCode::NOT_FOUND, err)
        }
        Err(err) => {
            tracing::error!("Delete book {} failed {}", book_id, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    })
}
