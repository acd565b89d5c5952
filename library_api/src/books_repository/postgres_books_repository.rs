use anyhow::Context;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{Book, BookDetails, BookId};
use crate::books_repository::BookRepositoryError::Other;
use crate::books_repository::{BookRepository, BookRepositoryError};
use crate::request_context::RequestContext;

const BOOK_COLUMNS: &str = "id, title, author, available, quantity, created_at, updated_at";

const MIGRATION: &str = "
    CREATE TABLE IF NOT EXISTS books (
        id              SERIAL PRIMARY KEY,
        title           TEXT NOT NULL,
        author          TEXT NOT NULL,
        available       INTEGER NOT NULL DEFAULT 1,
        quantity        INTEGER NOT NULL DEFAULT 1,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    ALTER TABLE books ADD COLUMN IF NOT EXISTS title TEXT NOT NULL DEFAULT '';
    ALTER TABLE books ADD COLUMN IF NOT EXISTS author TEXT NOT NULL DEFAULT '';
    ALTER TABLE books ADD COLUMN IF NOT EXISTS available INTEGER NOT NULL DEFAULT 1;
    ALTER TABLE books ADD COLUMN IF NOT EXISTS quantity INTEGER NOT NULL DEFAULT 1;
    ALTER TABLE books ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ NOT NULL DEFAULT now();
    ALTER TABLE books ADD COLUMN IF NOT EXISTS updated_at TIMESTAMPTZ NOT NULL DEFAULT now();
";

pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl PostgresBooksRepository {
    /// Connects and brings the schema up to date
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let repository = Self::connect(config).await?;
        repository.migrate().await?;
        Ok(repository)
    }

    pub async fn connect(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        tracing::info!(
            "Connecting to postgres at {}:{}/{} as {}",
            config.hostname,
            config.port,
            config.database,
            config.username
        );
        let (client, connection) = tokio_postgres::Config::new()
            .host(&config.hostname)
            .port(config.port)
            .user(&config.username)
            .password(&config.password)
            .dbname(&config.database)
            .connect(NoTls)
            .await
            .context("Failed to connect to postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Idempotent, safe to run on every start
    pub async fn migrate(&self) -> anyhow::Result<()> {
        self.client
            .batch_execute(MIGRATION)
            .await
            .context("Failed to migrate books table")?;
        tracing::info!("Books table migrated");
        Ok(())
    }

    async fn prepare(
        &self,
        ctx: &RequestContext,
        query: &str,
    ) -> Result<Statement, BookRepositoryError> {
        ctx.run(self.client.prepare(query)).await
    }
}

/// SERIAL ids never exceed i32::MAX, larger ids can not be stored
fn to_sql_id(book_id: BookId) -> Result<i32, BookRepositoryError> {
    i32::try_from(book_id).map_err(|_| BookRepositoryError::NotFound(book_id))
}

fn book_from_row(row: &Row) -> Result<Book, BookRepositoryError> {
    let id: i32 = row.try_get("id")?;
    Ok(Book {
        id: BookId::try_from(id).map_err(|_| Other(format!("Invalid book id {} stored", id)))?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        available: row.try_get("available")?,
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn create(
        &self,
        ctx: &RequestContext,
        details: BookDetails,
    ) -> Result<Book, BookRepositoryError> {
        let stmt = self
            .prepare(
                ctx,
                &format!(
                    "INSERT INTO books (title, author, available, quantity) VALUES ($1, $2, $3, $4) RETURNING {}",
                    BOOK_COLUMNS
                ),
            )
            .await?;

        let rows = ctx
            .run(self.client.query(
                &stmt,
                &[
                    &details.title,
                    &details.author,
                    &details.available,
                    &details.quantity,
                ],
            ))
            .await?;

        book_from_row(
            rows.first()
                .ok_or_else(|| Other("Book not returned".to_string()))?,
        )
    }

    async fn find_by_id(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<Book, BookRepositoryError> {
        let sql_id = to_sql_id(book_id)?;
        let stmt = self
            .prepare(
                ctx,
                &format!("SELECT {} FROM books WHERE id = ($1)", BOOK_COLUMNS),
            )
            .await?;

        let rows = ctx.run(self.client.query(&stmt, &[&sql_id])).await?;

        book_from_row(
            rows.first()
                .ok_or(BookRepositoryError::NotFound(book_id))?,
        )
    }

    async fn find_all(&self, ctx: &RequestContext) -> Result<Vec<Book>, BookRepositoryError> {
        let stmt = self
            .prepare(
                ctx,
                &format!("SELECT {} FROM books ORDER BY id", BOOK_COLUMNS),
            )
            .await?;

        let rows = ctx.run(self.client.query(&stmt, &[])).await?;

        rows.iter().map(book_from_row).collect()
    }

    async fn update(&self, ctx: &RequestContext, book: &Book) -> Result<(), BookRepositoryError> {
        let sql_id = to_sql_id(book.id)?;
        let stmt = self
            .prepare(
                ctx,
                "UPDATE books SET title = $1, author = $2, available = $3, quantity = $4, updated_at = now() WHERE id = ($5) RETURNING id",
            )
            .await?;

        let rows = ctx
            .run(self.client.query(
                &stmt,
                &[
                    &book.title,
                    &book.author,
                    &book.available,
                    &book.quantity,
                    &sql_id,
                ],
            ))
            .await?;

        if rows.is_empty() {
            Err(BookRepositoryError::NotFound(book.id))
        } else {
            Ok(())
        }
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        book_id: BookId,
    ) -> Result<(), BookRepositoryError> {
        let sql_id = to_sql_id(book_id)?;
        let stmt = self
            .prepare(ctx, "DELETE FROM books WHERE id = ($1) RETURNING id")
            .await?;

        let rows = ctx.run(self.client.query(&stmt, &[&sql_id])).await?;

        if rows.is_empty() {
            Err(BookRepositoryError::NotFound(book_id))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod postgres_books_repository_tests {
    use serial_test::file_serial;
    use testcontainers::core::IntoContainerPort;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::{ContainerAsync, GenericImage, ImageExt};

    use crate::api::{Book, BookDetails};
    use crate::books_repository::{
        BookRepository, BookRepositoryError, PostgresBooksRepository,
        PostgresBooksRepositoryConfig,
    };
    use crate::request_context::RequestContext;

    async fn start_postgres_container_and_init_repo(
    ) -> (ContainerAsync<GenericImage>, PostgresBooksRepository) {
        let _pg_container = GenericImage::new("postgres", "latest")
            .with_mapped_port(5432, 5432.tcp())
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .start()
            .await
            .expect("Failed to start postgres");

        for _ in 0..10 {
            if let Ok(repo) = PostgresBooksRepository::init(PostgresBooksRepositoryConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5432,
                username: "postgres".to_string(),
                password: "postgres".to_string(),
                database: "postgres".to_string(),
            })
            .await
            {
                return (_pg_container, repo);
            }
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        }
        panic!("Failed to setup postgres container")
    }

    fn book_details(title: &str) -> BookDetails {
        BookDetails {
            title: title.to_string(),
            author: "www".to_string(),
            available: 3,
            quantity: 3,
        }
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests if create and find_by_id work correctly
    /// for the sake of not starting container multiple times it tests everything in one testcase
    async fn test_create_book_and_find_it() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;
        let ctx = RequestContext::background();

        let book_not_found = repo.find_by_id(&ctx, 20000).await;
        assert!(matches!(
            book_not_found,
            Err(BookRepositoryError::NotFound(20000))
        ));

        let out_of_range = repo.find_by_id(&ctx, u32::MAX).await;
        assert!(matches!(
            out_of_range,
            Err(BookRepositoryError::NotFound(..))
        ));

        let created = repo
            .create(&ctx, book_details("xx"))
            .await
            .expect("Failed to create book");
        assert!(created.id >= 1);
        assert_eq!(created.title, "xx");
        assert_eq!(created.available, 3);

        let found = repo
            .find_by_id(&ctx, created.id)
            .await
            .expect("Failed to find book");
        assert_eq!(found, created);

        // running the migration again leaves data in place
        repo.migrate().await.expect("Failed to rerun migration");
        assert_eq!(repo.find_by_id(&ctx, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests if find_all works correctly
    async fn test_create_books_and_list_them() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;
        let ctx = RequestContext::background();

        let list = repo.find_all(&ctx).await.expect("Failed to list books");
        assert!(list.is_empty());

        let book1 = repo.create(&ctx, book_details("title1")).await.unwrap();
        let book2 = repo.create(&ctx, book_details("title2")).await.unwrap();

        let list = repo.find_all(&ctx).await.expect("Failed to list books");
        assert_eq!(list, vec![book1, book2]);
    }

    #[tokio::test]
    #[file_serial(key, path => "../.pgtestslock")]
    /// Tests update and delete
    /// 1. Update and delete of missing book give NotFound
    /// 2. Update overwrites fields, keeps created_at
    /// 3. Deleted id is not reused by the next create
    async fn test_update_and_delete_book() {
        let (_container, repo) = start_postgres_container_and_init_repo().await;
        let ctx = RequestContext::background();

        let created = repo.create(&ctx, book_details("xx")).await.unwrap();

        let missing = Book {
            id: 2000,
            ..created.clone()
        };
        assert!(matches!(
            repo.update(&ctx, &missing).await,
            Err(BookRepositoryError::NotFound(2000))
        ));
        assert!(matches!(
            repo.delete(&ctx, 2000).await,
            Err(BookRepositoryError::NotFound(2000))
        ));

        let changed = Book {
            title: "patchedTitle".to_string(),
            available: 1,
            quantity: 5,
            ..created.clone()
        };
        repo.update(&ctx, &changed).await.expect("Failed to update");

        let found = repo.find_by_id(&ctx, created.id).await.unwrap();
        assert_eq!(found.title, "patchedTitle");
        assert_eq!(found.available, 1);
        assert_eq!(found.quantity, 5);
        assert_eq!(found.created_at, created.created_at);
        assert!(found.updated_at >= created.updated_at);

        repo.delete(&ctx, created.id).await.expect("Failed to delete");
        assert!(matches!(
            repo.find_by_id(&ctx, created.id).await,
            Err(BookRepositoryError::NotFound(..))
        ));

        let next = repo.create(&ctx, book_details("next")).await.unwrap();
        assert!(next.id > created.id);
    }
}
