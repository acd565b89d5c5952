use std::sync::Arc;

use crate::api::{Book, BookDetails, BookId, BookValidationError};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::request_context::RequestContext;

#[derive(thiserror::Error, Debug)]
pub enum BooksServiceError {
    #[error(transparent)]
    Validation(#[from] BookValidationError),

    #[error("book not found")]
    BookNotFound,

    #[error("book not present or already deleted")]
    BookNotPresent,

    #[error(transparent)]
    Repository(#[from] BookRepositoryError),
}

/// Replaces a store level NotFound with the message the caller should see,
/// other store failures are passed through untouched
fn not_found_as(err: BookRepositoryError, replacement: BooksServiceError) -> BooksServiceError {
    match err {
        BookRepositoryError::NotFound(_) => replacement,
        other => BooksServiceError::Repository(other),
    }
}

/// Business rules of the catalogue on top of whichever repository was configured
#[derive(Clone)]
pub struct BooksService {
    repository: Arc<dyn BookRepository>,
}

impl BooksService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    /// A freshly registered book has all of its copies available, whatever the caller sent
    pub async fn create_book(
        &self,
        ctx: &RequestContext,
        details: BookDetails,
    ) -> Result<Book, BooksServiceError> {
        details.validate()?;

        let details = BookDetails {
            available: details.quantity,
            ..details
        };
        Ok(self.repository.create(ctx, details).await?)
    }

    pub async fn get_book(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<Book, BooksServiceError> {
        self.repository
            .find_by_id(ctx, book_id)
            .await
            .map_err(|err| not_found_as(err, BooksServiceError::BookNotFound))
    }

    pub async fn get_all_books(&self, ctx: &RequestContext) -> Result<Vec<Book>, BooksServiceError> {
        Ok(self.repository.find_all(ctx).await?)
    }

    /// Replaces title, author and copy counts of an existing book
    pub async fn update_book(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
        updated: BookDetails,
    ) -> Result<(), BooksServiceError> {
        let mut existing = self.get_book(ctx, book_id).await?;

        existing.title = updated.title;
        existing.author = updated.author;
        existing.quantity = updated.quantity;
        existing.available = updated.available;
        existing.validate()?;

        // the book may have been deleted since it was read
        self.repository
            .update(ctx, &existing)
            .await
            .map_err(|err| not_found_as(err, BooksServiceError::BookNotFound))
    }

    pub async fn delete_book(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<(), BooksServiceError> {
        self.repository
            .find_by_id(ctx, book_id)
            .await
            .map_err(|err| not_found_as(err, BooksServiceError::BookNotPresent))?;

        self.repository
            .delete(ctx, book_id)
            .await
            .map_err(|err| not_found_as(err, BooksServiceError::BookNotPresent))
    }
}
