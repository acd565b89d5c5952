use std::future::{ready, Future, Ready};
use std::time::Duration;

use actix_web::dev::Payload;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use tokio::time::Instant;

use crate::books_repository::BookRepositoryError;

/// Upper bound for the downstream work of a single request, `None` disables the deadline
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Option<Duration>);

/// Request scoped carrier handed to every repository call.
///
/// Client disconnects are covered by actix dropping the handler future,
/// the deadline covers slow stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Context without a deadline, used outside of HTTP requests
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails once the deadline has passed
    pub fn ensure_active(&self) -> Result<(), BookRepositoryError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(BookRepositoryError::DeadlineExceeded)
            }
            _ => Ok(()),
        }
    }

    /// Drives a store round-trip, aborting it when the deadline elapses
    pub async fn run<F, T, E>(&self, operation: F) -> Result<T, BookRepositoryError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<BookRepositoryError>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, operation)
                .await
                .map_err(|_| BookRepositoryError::DeadlineExceeded)?
                .map_err(Into::into),
            None => operation.await.map_err(Into::into),
        }
    }
}

impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let context = match req
            .app_data::<Data<RequestTimeout>>()
            .and_then(|timeout| timeout.0)
        {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::background(),
        };
        ready(Ok(context))
    }
}

// Not part of the documented request, only needed so handlers can extract it
impl paperclip::v2::schema::Apiv2Schema for RequestContext {}
impl paperclip::actix::OperationModifier for RequestContext {}
