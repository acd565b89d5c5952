use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = u32;

pub const SERVICE_NAME: &str = "library-api";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Book record as persisted in the catalogue
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Copies currently loanable
    pub available: i32,
    /// Total copies owned
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Body of create and update requests. Update replaces every field, there are no partial updates,
/// omitted fields are taken as empty or zero.
pub struct BookDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub available: i32,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookValidationError {
    #[error("title is mandatory")]
    TitleMissing,

    #[error("author is mandatory")]
    AuthorMissing,

    #[error("availability can not be negative")]
    NegativeAvailable,

    #[error("quantity is always more or equal to availability")]
    AvailableExceedsQuantity,
}

fn validate_fields(
    title: &str,
    author: &str,
    available: i32,
    quantity: i32,
) -> Result<(), BookValidationError> {
    if title.is_empty() {
        return Err(BookValidationError::TitleMissing);
    }
    if author.is_empty() {
        return Err(BookValidationError::AuthorMissing);
    }
    if available < 0 {
        return Err(BookValidationError::NegativeAvailable);
    }
    if available > quantity {
        return Err(BookValidationError::AvailableExceedsQuantity);
    }
    Ok(())
}

impl Book {
    /// Checks the invariants every persisted book has to hold
    pub fn validate(&self) -> Result<(), BookValidationError> {
        validate_fields(&self.title, &self.author, self.available, self.quantity)
    }

    pub fn is_available(&self) -> bool {
        self.available > 0
    }
}

impl BookDetails {
    pub fn validate(&self) -> Result<(), BookValidationError> {
        validate_fields(&self.title, &self.author, self.available, self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct CreateBookResponse {
    pub message: String,
    pub data: Book,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct GetBookResponse {
    pub data: Book,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct GetAllBooksResponse {
    pub data: Vec<Book>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[cfg(test)]
mod api_tests {
    use super::*;

    fn details(title: &str, author: &str, available: i32, quantity: i32) -> BookDetails {
        BookDetails {
            title: title.to_string(),
            author: author.to_string(),
            available,
            quantity,
        }
    }

    #[test]
    fn test_validation_reports_first_broken_rule() {
        assert_eq!(details("A", "X", 1, 1).validate(), Ok(()));
        assert_eq!(details("A", "X", 0, 0).validate(), Ok(()));
        assert_eq!(
            details("", "", -1, 0).validate(),
            Err(BookValidationError::TitleMissing)
        );
        assert_eq!(
            details("A", "", 1, 1).validate(),
            Err(BookValidationError::AuthorMissing)
        );
        assert_eq!(
            details("A", "X", -1, 1).validate(),
            Err(BookValidationError::NegativeAvailable)
        );
        assert_eq!(
            details("A", "X", 5, 1).validate(),
            Err(BookValidationError::AvailableExceedsQuantity)
        );
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            BookValidationError::TitleMissing.to_string(),
            "title is mandatory"
        );
        assert_eq!(
            BookValidationError::AvailableExceedsQuantity.to_string(),
            "quantity is always more or equal to availability"
        );
    }

    #[test]
    fn test_book_is_available() {
        let now = Utc::now();
        let mut book = Book {
            id: 1,
            title: "A".to_string(),
            author: "X".to_string(),
            available: 1,
            quantity: 2,
            created_at: now,
            updated_at: now,
        };
        assert!(book.is_available());
        book.available = 0;
        assert!(!book.is_available());
        assert_eq!(book.validate(), Ok(()));
    }

    #[test]
    /// Omitted fields decode as empty or zero
    fn test_details_defaults_when_fields_omitted() {
        let parsed: BookDetails = serde_json::from_str(r#"{"author":"X"}"#).unwrap();
        assert_eq!(parsed, details("", "X", 0, 0));
        assert_eq!(parsed.validate(), Err(BookValidationError::TitleMissing));

        let parsed: BookDetails =
            serde_json::from_str(r#"{"title":"A","author":"X","quantity":0}"#).unwrap();
        assert_eq!(parsed, details("A", "X", 0, 0));
        assert_eq!(parsed.validate(), Ok(()));
    }
}
