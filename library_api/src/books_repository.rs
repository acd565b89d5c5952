pub use in_memory_books_repository::InMemoryBooksRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookDetails, BookId};
use crate::request_context::RequestContext;

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Other error {0}")]
    Other(String),
}

/// Storage of the catalogue. Every returned book is an owned snapshot,
/// changing it never touches what is stored.
#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Stores a new book, returns it with the assigned id and timestamps
    async fn create(
        &self,
        ctx: &RequestContext,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError>;
    /// Retrieves a single book
    async fn find_by_id(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<Book, BookRepositoryError>;
    /// Lists all books, order is unspecified
    async fn find_all(&self, ctx: &RequestContext) -> Result<Vec<Book>, BookRepositoryError>;
    /// Overwrites title, author and copy counts of an existing book and refreshes `updated_at`
    async fn update(&self, ctx: &RequestContext, book: &Book) -> Result<(), BookRepositoryError>;
    /// Removes a book, its id is never handed out again
    async fn delete(&self, ctx: &RequestContext, book_id: BookId)
        -> Result<(), BookRepositoryError>;
}
