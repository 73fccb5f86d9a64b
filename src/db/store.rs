//! Data access for series and quotes.
//!
//! The store is the only component that writes to the database. Multi-row
//! writes run inside a single transaction.

use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{NewQuote, Quote, Series};

/// Outcome of a random-quote lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RandomQuote {
    Found(Quote),
    /// The series exists but has no quotes yet
    EmptySeries,
    UnknownSeries,
}

/// Counts from importing one series' quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesImport {
    pub series_created: bool,
    pub inserted: usize,
    pub skipped: usize,
}

/// One series of a quotes document, ready to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSeries {
    pub slug: String,
    pub name: String,
    pub quotes: Vec<NewQuote>,
}

/// Handle to the quotes database.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of series rows.
    pub async fn count_series(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM series")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Number of quote rows across all series.
    pub async fn count_quotes(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quotes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// All series slugs in creation order.
    pub async fn list_series_slugs(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT slug FROM series ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("slug")).collect())
    }

    /// Look up a series by slug.
    pub async fn find_series(&self, slug: &str) -> Result<Option<Series>, AppError> {
        let row = sqlx::query("SELECT id, slug, name FROM series WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(series_from_row))
    }

    /// All quotes of a series in insertion order, or `None` if the series
    /// does not exist. An existing series without quotes yields an empty list.
    pub async fn get_quotes(&self, slug: &str) -> Result<Option<Vec<Quote>>, AppError> {
        let Some(series) = self.find_series(slug).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT id, speaker, quote_text FROM quotes WHERE series_id = ? ORDER BY id ASC",
        )
        .bind(series.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(rows.iter().map(quote_from_row).collect()))
    }

    /// Pick one quote of a series uniformly at random.
    pub async fn get_random_quote(&self, slug: &str) -> Result<RandomQuote, AppError> {
        let Some(series) = self.find_series(slug).await? else {
            return Ok(RandomQuote::UnknownSeries);
        };

        let row = sqlx::query(
            "SELECT id, speaker, quote_text FROM quotes WHERE series_id = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(series.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => RandomQuote::Found(quote_from_row(&row)),
            None => RandomQuote::EmptySeries,
        })
    }

    /// Insert one quote. Returns `None` if the series does not exist.
    pub async fn insert_quote(
        &self,
        slug: &str,
        quote: &NewQuote,
    ) -> Result<Option<Quote>, AppError> {
        let Some(series) = self.find_series(slug).await? else {
            return Ok(None);
        };

        let result =
            sqlx::query("INSERT INTO quotes (series_id, speaker, quote_text) VALUES (?, ?, ?)")
                .bind(series.id)
                .bind(&quote.speaker)
                .bind(&quote.quote)
                .execute(&self.pool)
                .await?;

        Ok(Some(Quote {
            id: result.last_insert_rowid(),
            speaker: quote.speaker.clone(),
            quote: quote.quote.clone(),
        }))
    }

    /// Insert many quotes atomically. Returns `None` if the series does not
    /// exist. If any row fails nothing from the batch is committed.
    pub async fn insert_quotes_bulk(
        &self,
        slug: &str,
        quotes: &[NewQuote],
    ) -> Result<Option<usize>, AppError> {
        let Some(series) = self.find_series(slug).await? else {
            return Ok(None);
        };

        let mut tx = self.pool.begin().await?;

        for quote in quotes {
            insert_quote_row(&mut tx, series.id, quote).await?;
        }

        tx.commit().await?;
        Ok(Some(quotes.len()))
    }

    /// Execute a seed script. Statements run as written, so the script may
    /// carry its own `BEGIN`/`COMMIT`.
    pub async fn run_script(&self, sql: &str) -> Result<(), AppError> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Import every series of a document in one transaction, creating each
    /// missing series with its `name`. With `skip_existing`, quotes whose
    /// (series, speaker, text) already exist are counted as skipped instead of
    /// inserted again. On the first failure nothing is stored.
    pub async fn import_document(
        &self,
        document: &[DocumentSeries],
        skip_existing: bool,
    ) -> Result<Vec<SeriesImport>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut reports = Vec::with_capacity(document.len());

        for series in document {
            let report = import_series_rows(
                &mut tx,
                &series.slug,
                &series.name,
                &series.quotes,
                skip_existing,
            )
            .await?;
            reports.push(report);
        }

        tx.commit().await?;
        Ok(reports)
    }
}

async fn import_series_rows(
    tx: &mut Transaction<'_, Sqlite>,
    slug: &str,
    name: &str,
    quotes: &[NewQuote],
    skip_existing: bool,
) -> Result<SeriesImport, sqlx::Error> {
    let mut report = SeriesImport::default();

    let created =
        sqlx::query("INSERT INTO series (slug, name) VALUES (?, ?) ON CONFLICT(slug) DO NOTHING")
            .bind(slug)
            .bind(name)
            .execute(&mut **tx)
            .await?;
    report.series_created = created.rows_affected() > 0;

    let series_id: i64 = sqlx::query("SELECT id FROM series WHERE slug = ?")
        .bind(slug)
        .fetch_one(&mut **tx)
        .await?
        .get("id");

    for quote in quotes {
        if skip_existing && quote_exists(tx, series_id, quote).await? {
            report.skipped += 1;
            continue;
        }

        insert_quote_row(tx, series_id, quote).await?;
        report.inserted += 1;
    }

    Ok(report)
}

async fn insert_quote_row(
    tx: &mut Transaction<'_, Sqlite>,
    series_id: i64,
    quote: &NewQuote,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO quotes (series_id, speaker, quote_text) VALUES (?, ?, ?)")
        .bind(series_id)
        .bind(&quote.speaker)
        .bind(&quote.quote)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn quote_exists(
    tx: &mut Transaction<'_, Sqlite>,
    series_id: i64,
    quote: &NewQuote,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT 1 FROM quotes WHERE series_id = ? AND speaker = ? AND quote_text = ? LIMIT 1",
    )
    .bind(series_id)
    .bind(&quote.speaker)
    .bind(&quote.quote)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.is_some())
}

fn series_from_row(row: &sqlx::sqlite::SqliteRow) -> Series {
    Series {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
    }
}

fn quote_from_row(row: &sqlx::sqlite::SqliteRow) -> Quote {
    Quote {
        id: row.get("id"),
        speaker: row.get("speaker"),
        quote: row.get("quote_text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn import_series(
        store: &Store,
        slug: &str,
        name: &str,
        quotes: &[NewQuote],
        skip_existing: bool,
    ) -> Result<SeriesImport, AppError> {
        let series = DocumentSeries {
            slug: slug.to_string(),
            name: name.to_string(),
            quotes: quotes.to_vec(),
        };
        let mut reports = store.import_document(&[series], skip_existing).await?;
        Ok(reports.remove(0))
    }

    async fn test_store() -> (Store, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.db"))
            .await
            .expect("Failed to init DB");
        (Store::new(pool), temp_dir)
    }

    fn quote(speaker: &str, text: &str) -> NewQuote {
        NewQuote {
            speaker: speaker.to_string(),
            quote: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (store, _dir) = test_store().await;

        assert!(store.list_series_slugs().await.unwrap().is_empty());
        assert_eq!(store.count_series().await.unwrap(), 0);
        assert_eq!(store.count_quotes().await.unwrap(), 0);
        assert_eq!(store.get_quotes("murder-drones").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_series_listed_in_creation_order() {
        let (store, _dir) = test_store().await;
        store
            .run_script(
                "INSERT INTO series (slug, name) VALUES ('zeta', 'Zeta');
                 INSERT INTO series (slug, name) VALUES ('alpha', 'Alpha');",
            )
            .await
            .unwrap();

        assert_eq!(store.list_series_slugs().await.unwrap(), vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn test_found_but_empty_is_not_missing() {
        let (store, _dir) = test_store().await;
        import_series(&store, "empty-one", "Empty One", &[], false).await.unwrap();

        assert_eq!(store.get_quotes("empty-one").await.unwrap(), Some(vec![]));
        assert_eq!(
            store.get_random_quote("empty-one").await.unwrap(),
            RandomQuote::EmptySeries
        );
        assert_eq!(
            store.get_random_quote("missing").await.unwrap(),
            RandomQuote::UnknownSeries
        );
    }

    #[tokio::test]
    async fn test_quotes_in_insertion_order() {
        let (store, _dir) = test_store().await;
        import_series(
            &store,
            "murder-drones",
            "Murder Drones",
            &[quote("Uzi", "first"), quote("N", "second"), quote("V", "third")],
            false,
        )
        .await
        .unwrap();

        let quotes = store.get_quotes("murder-drones").await.unwrap().unwrap();
        let texts: Vec<&str> = quotes.iter().map(|q| q.quote.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(quotes.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_random_quote_belongs_to_series_and_varies() {
        let (store, _dir) = test_store().await;
        let own: Vec<NewQuote> = (0..5).map(|i| quote("Uzi", &format!("line {i}"))).collect();
        import_series(&store, "murder-drones", "Murder Drones", &own, false).await.unwrap();
        import_series(&store, "other-show", "Other Show", &[quote("X", "elsewhere")], false)
            .await
            .unwrap();

        let mut seen = HashSet::new();
        for _ in 0..100 {
            match store.get_random_quote("murder-drones").await.unwrap() {
                RandomQuote::Found(q) => {
                    assert_ne!(q.quote, "elsewhere");
                    seen.insert(q.id);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert!(seen.len() > 1);
    }

    #[tokio::test]
    async fn test_insert_quote() {
        let (store, _dir) = test_store().await;
        import_series(&store, "murder-drones", "Murder Drones", &[], false).await.unwrap();

        let inserted = store
            .insert_quote("murder-drones", &quote("N", "Hi!"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted.speaker, "N");
        assert_eq!(inserted.quote, "Hi!");

        let quotes = store.get_quotes("murder-drones").await.unwrap().unwrap();
        assert_eq!(quotes, vec![inserted]);

        assert_eq!(store.insert_quote("missing", &quote("N", "Hi!")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bulk_insert() {
        let (store, _dir) = test_store().await;
        import_series(&store, "murder-drones", "Murder Drones", &[], false).await.unwrap();

        let count = store
            .insert_quotes_bulk("murder-drones", &[quote("A", "one"), quote("B", "two")])
            .await
            .unwrap();
        assert_eq!(count, Some(2));
        assert_eq!(store.count_quotes().await.unwrap(), 2);

        assert_eq!(
            store.insert_quotes_bulk("missing", &[quote("A", "one")]).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_bulk_insert_rolls_back_on_failure() {
        let (store, _dir) = test_store().await;
        import_series(&store, "murder-drones", "Murder Drones", &[], false).await.unwrap();

        // The blank speaker violates the table's CHECK constraint mid-batch.
        let result = store
            .insert_quotes_bulk(
                "murder-drones",
                &[quote("A", "one"), quote("  ", "two"), quote("C", "three")],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.count_quotes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_skip_existing() {
        let (store, _dir) = test_store().await;
        let items = [quote("Uzi", "one"), quote("N", "two")];

        let first = import_series(&store, "murder-drones", "Murder Drones", &items, true)
            .await
            .unwrap();
        assert_eq!(
            first,
            SeriesImport {
                series_created: true,
                inserted: 2,
                skipped: 0
            }
        );

        let second = import_series(&store, "murder-drones", "Ignored Name", &items, true)
            .await
            .unwrap();
        assert_eq!(
            second,
            SeriesImport {
                series_created: false,
                inserted: 0,
                skipped: 2
            }
        );
        assert_eq!(store.count_quotes().await.unwrap(), 2);

        let series = store.find_series("murder-drones").await.unwrap().unwrap();
        assert_eq!(series.name, "Murder Drones");
    }

    #[tokio::test]
    async fn test_run_script_accepts_own_transaction() {
        let (store, _dir) = test_store().await;
        store
            .run_script(
                "BEGIN TRANSACTION;
                 INSERT INTO series (slug, name) VALUES ('murder-drones', 'Murder Drones');
                 INSERT INTO series (slug, name) VALUES ('hazbin-hotel', 'Hazbin Hotel');
                 COMMIT;",
            )
            .await
            .unwrap();

        assert_eq!(
            store.list_series_slugs().await.unwrap(),
            vec!["murder-drones", "hazbin-hotel"]
        );
    }

    #[tokio::test]
    async fn test_import_document_is_all_or_nothing() {
        let (store, _dir) = test_store().await;
        store
            .run_script(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON quotes
                 WHEN NEW.speaker = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
            )
            .await
            .unwrap();

        let document = vec![
            DocumentSeries {
                slug: "murder-drones".into(),
                name: "Murder Drones".into(),
                quotes: vec![quote("Uzi", "one"), quote("N", "two")],
            },
            DocumentSeries {
                slug: "hazbin-hotel".into(),
                name: "Hazbin Hotel".into(),
                quotes: vec![quote("Charlie", "three"), quote("boom", "four")],
            },
        ];

        assert!(store.import_document(&document, false).await.is_err());
        assert_eq!(store.count_quotes().await.unwrap(), 0);
        assert_eq!(store.count_series().await.unwrap(), 0);

        store.run_script("DROP TRIGGER reject_boom;").await.unwrap();

        let reports = store.import_document(&document, false).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.series_created && r.inserted == 2));
        assert_eq!(store.count_quotes().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_import_without_skip_duplicates() {
        let (store, _dir) = test_store().await;
        let items = [quote("Uzi", "one")];

        import_series(&store, "ab", "Ab", &items, false).await.unwrap();
        import_series(&store, "ab", "Ab", &items, false).await.unwrap();

        assert_eq!(store.count_quotes().await.unwrap(), 2);
    }
}
