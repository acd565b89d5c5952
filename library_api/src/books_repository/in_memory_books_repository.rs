use std::collections::HashMap;

use chrono::Utc;

use crate::api::{Book, BookDetails, BookId};
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::request_context::RequestContext;

struct InMemoryBooks {
    books: HashMap<BookId, Book>,
    /// None once every id has been handed out
    next_book_id: Option<BookId>,
}

/// Keeps books in a map, ids are handed out from a counter guarded by the same lock
pub struct InMemoryBooksRepository {
    state: parking_lot::RwLock<InMemoryBooks>,
}

impl Default for InMemoryBooksRepository {
    fn default() -> Self {
        Self {
            state: parking_lot::RwLock::new(InMemoryBooks {
                books: HashMap::new(),
                next_book_id: Some(1),
            }),
        }
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBooksRepository {
    async fn create(
        &self,
        ctx: &RequestContext,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError> {
        ctx.ensure_active()?;
        let mut state = self.state.write();

        let book_id = state
            .next_book_id
            .ok_or_else(|| BookRepositoryError::Other("Book ids exhausted".to_string()))?;
        state.next_book_id = book_id.checked_add(1);

        let now = Utc::now();
        let book = Book {
            id: book_id,
            title: details.title,
            author: details.author,
            available: details.available,
            quantity: details.quantity,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(book_id, book.clone());
        Ok(book)
    }

    async fn find_by_id(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<Book, BookRepositoryError> {
        ctx.ensure_active()?;
        self.state
            .read()
            .books
            .get(&book_id)
            .cloned()
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn find_all(&self, ctx: &RequestContext) -> Result<Vec<Book>, BookRepositoryError> {
        ctx.ensure_active()?;
        Ok(self.state.read().books.values().cloned().collect())
    }

    async fn update(&self, ctx: &RequestContext, book: &Book) -> Result<(), BookRepositoryError> {
        ctx.ensure_active()?;
        let mut state = self.state.write();
        let stored = state
            .books
            .get_mut(&book.id)
            .ok_or(BookRepositoryError::NotFound(book.id))?;

        *stored = Book {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..book.clone()
        };
        Ok(())
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<(), BookRepositoryError> {
        ctx.ensure_active()?;
        self.state
            .write()
            .books
            .remove(&book_id)
            .map(|_| ())
            .ok_or(BookRepositoryError::NotFound(book_id))
    }
}
