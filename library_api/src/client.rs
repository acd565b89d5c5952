use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{
    Book, BookDetails, BookId, CreateBookResponse, ErrorResponse, GetAllBooksResponse,
    GetBookResponse, HealthResponse,
};

pub struct LibraryApiClient {
    url: String,
    client: ClientWithMiddleware,
}

/// Pulls the `error` field out of a failed response, empty if the body has none
async fn error_message(response: reqwest::Response) -> String {
    response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_default()
}

impl LibraryApiClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        // No retry layer, a resent POST would store the book twice
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Calls GET /health endpoint
    pub async fn health(&self) -> anyhow::Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Service unhealthy, status {}", response.status())
        }
        Ok(response.json().await?)
    }

    /// Calls POST /api/v1/books endpoint
    /// Returns the stored book with its assigned id
    pub async fn create_book(&self, details: &BookDetails) -> anyhow::Result<Book> {
        let response = self
            .client
            .post(format!("{}/api/v1/books", self.url))
            .json(details)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            bail!("Failed to create book {}", error_message(response).await)
        }

        let created: CreateBookResponse = response.json().await?;
        Ok(created.data)
    }

    /// Calls GET /api/v1/books/{book_id} endpoint
    /// Returns None if the book is not in the catalogue
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/api/v1/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            let found: GetBookResponse = response.json().await?;
            Ok(Some(found.data))
        } else {
            bail!("Failed to get book {}", error_message(response).await)
        }
    }

    /// Calls GET /api/v1/books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/api/v1/books", self.url))
            .send()
            .await?;
        if response.status().is_success() {
            let all: GetAllBooksResponse = response.json().await?;
            Ok(all.data)
        } else {
            bail!("Failed to list books {}", error_message(response).await)
        }
    }

    /// Calls PUT /api/v1/books/{book_id} endpoint, every field of the book is replaced
    pub async fn update_book(&self, book_id: BookId, details: &BookDetails) -> anyhow::Result<()> {
        let response = self
            .client
            .put(format!("{}/api/v1/books/{}", self.url, book_id))
            .json(details)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            bail!("Failed to update book {}", error_message(response).await)
        }
    }

    /// Calls DELETE /api/v1/books/{book_id} endpoint
    /// Returns false if there was nothing to delete
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/v1/books/{}", self.url, book_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            bail!("Failed to delete book {}", error_message(response).await)
        }
    }
}

#[cfg(test)]
mod client_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::{web, App, HttpResponse, HttpServer};

    use crate::api::{BookDetails, ErrorResponse};
    use crate::client::LibraryApiClient;

    async fn unavailable(requests: web::Data<AtomicUsize>) -> HttpResponse {
        requests.fetch_add(1, Ordering::SeqCst);
        HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "store unavailable".to_string(),
        })
    }

    #[actix_web::test]
    /// A create answered with a transient error is sent exactly once
    async fn test_failed_create_is_not_resent() {
        let requests = web::Data::new(AtomicUsize::new(0));
        let server_requests = requests.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_requests.clone())
                .route("/api/v1/books", web::post().to(unavailable))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind test server");
        let port = server.addrs()[0].port();
        let server = server.run();
        let server_handle = server.handle();
        actix_web::rt::spawn(server);

        let client = LibraryApiClient::new(&format!("http://127.0.0.1:{}", port))
            .expect("Failed to create client");
        let details = BookDetails {
            title: "A".to_string(),
            author: "X".to_string(),
            available: 1,
            quantity: 1,
        };
        let err = client
            .create_book(&details)
            .await
            .expect_err("Create should fail");
        assert!(err.to_string().contains("store unavailable"));
        assert_eq!(requests.load(Ordering::SeqCst), 1);

        server_handle.stop(true).await;
    }
}
