
use super::VectorRecord;
use crate::embeddings::chunking::ChunkMetadata;
use crate::{RagError, Result, config::Config};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase, Select},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A named collection of chunk vectors backed by a LanceDB table
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance, lower is closer
    pub distance: f32,
    /// `1 - distance`, higher is better
    pub similarity_score: f32,
}

impl VectorStore {
    /// Open the collection named in `config` under the config directory
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        Self::open(config.vector_database_path(), &config.data.collection_name).await
    }

    /// Connect to the database at `db_path` and bind to `table_name`.
    /// The table itself is created lazily by the first upsert.
    #[inline]
    pub async fn open<P: AsRef<Path>>(db_path: P, table_name: &str) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());

        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                if e.to_string().to_lowercase().contains("corrupt") {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(&db_path)?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        RagError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })?
                } else {
                    return Err(RagError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )));
                }
            }
        };

        let mut store = Self {
            connection,
            table_name: table_name.to_string(),
            vector_dimension: None,
        };

        if store.exists().await? {
            match store.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    debug!("Collection {} has vector dimension {}", table_name, dim);
                    store.vector_dimension = Some(dim);
                }
                Err(e) => warn!("Could not detect vector dimension of {}: {}", table_name, e),
            }
        }

        info!("Vector store ready (collection: {})", table_name);
        Ok(store)
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    #[inline]
    pub async fn exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Option<Table>> {
        if !self.exists().await? {
            return Ok(None);
        }

        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map(Some)
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize> {
        let table = self
            .open_table()
            .await?
            .ok_or_else(|| RagError::Database("Collection does not exist".to_string()))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Database("Could not find vector column or determine dimension".to_string())
            })
    }

    fn create_schema(vector_dim: i32) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim,
                ),
                false,
            ),
            Field::new("document", DataType::Utf8, false),
            Field::new("source_url", DataType::Utf8, true),
            Field::new("tags", DataType::Utf8, true),
            Field::new("source_title", DataType::Utf8, true),
            Field::new("author_or_channel", DataType::Utf8, true),
            Field::new("published_date", DataType::Utf8, true),
            Field::new("entities", DataType::Utf8, true),
        ]))
    }

    /// Insert or replace records keyed on `id`, creating the table on first use.
    /// A dimension change recreates the table.
    #[inline]
    pub async fn upsert(&mut self, records: &[VectorRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            debug!("No records to upsert");
            return Ok(0);
        };

        let vector_dim = first.vector.len();
        if vector_dim == 0 {
            return Err(RagError::Database("Cannot store empty vectors".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RagError::Database(format!(
                "Record {} has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                vector_dim
            )));
        }

        if !self.exists().await? {
            self.create_table(vector_dim).await?;
        } else if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.drop_collection().await?;
            self.create_table(vector_dim).await?;
        }

        let record_batch = Self::create_record_batch(records, vector_dim)?;
        let table = self
            .open_table()
            .await?
            .ok_or_else(|| RagError::Database("Collection vanished during upsert".to_string()))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| RagError::Database(format!("Failed to upsert records: {}", e)))?;

        debug!("Upserted {} records into {}", records.len(), self.table_name);
        Ok(records.len())
    }

    async fn create_table(&mut self, vector_dim: usize) -> Result<()> {
        let dim = i32::try_from(vector_dim)
            .map_err(|_| RagError::Database(format!("Vector dimension {} too large", vector_dim)))?;

        self.connection
            .create_empty_table(&self.table_name, Self::create_schema(dim))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(vector_dim);
        info!(
            "Created collection {} with {} dimensions",
            self.table_name, vector_dim
        );
        Ok(())
    }

    fn create_record_batch(records: &[VectorRecord], vector_dim: usize) -> Result<RecordBatch> {
        let len = records.len();
        let dim = i32::try_from(vector_dim)
            .map_err(|_| RagError::Database(format!("Vector dimension {} too large", vector_dim)))?;

        let mut flat_values = Vec::with_capacity(len * vector_dim);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, dim, Arc::new(Float32Array::from(flat_values)), None)
                .map_err(|e| {
                    RagError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let column = |select: fn(&VectorRecord) -> Option<&str>| -> Arc<dyn Array> {
            Arc::new(StringArray::from(
                records.iter().map(select).collect::<Vec<_>>(),
            ))
        };

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(
                records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(vector_array),
            Arc::new(StringArray::from(
                records
                    .iter()
                    .map(|r| r.document.as_str())
                    .collect::<Vec<_>>(),
            )),
            column(|r| r.metadata.source_url.as_deref()),
            column(|r| r.metadata.tags.as_deref()),
            column(|r| r.metadata.source_title.as_deref()),
            column(|r| r.metadata.author_or_channel.as_deref()),
            column(|r| r.metadata.published_date.as_deref()),
            column(|r| r.metadata.entities.as_deref()),
        ];

        RecordBatch::try_new(Self::create_schema(dim), arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Up to `limit` nearest records by cosine distance, most similar first.
    /// A missing collection yields no results.
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 || query_vector.is_empty() {
            return Ok(Vec::new());
        }

        let Some(table) = self.open_table().await? else {
            debug!("Collection {} does not exist yet", self.table_name);
            return Ok(Vec::new());
        };

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching {} ({} rows) with limit {}", self.table_name, rows, limit);

        let results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Self::collect_stream(results, Self::parse_search_batch).await?;
        search_results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        Ok(search_results)
    }

    async fn collect_stream<T, F>(
        mut stream: lancedb::arrow::SendableRecordBatchStream,
        parse: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&RecordBatch) -> Result<Vec<T>>,
    {
        let mut items = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            items.extend(parse(&batch)?);
        }
        Ok(items)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let ids = string_column(batch, "id")?;
        let documents = string_column(batch, "document")?;
        let source_urls = string_column(batch, "source_url")?;
        let tags = string_column(batch, "tags")?;
        let source_titles = string_column(batch, "source_title")?;
        let authors = string_column(batch, "author_or_channel")?;
        let published_dates = string_column(batch, "published_date")?;
        let entities = string_column(batch, "entities")?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let results = (0..batch.num_rows())
            .map(|row| {
                let distance = distances
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                SearchResult {
                    id: ids.value(row).to_string(),
                    document: documents.value(row).to_string(),
                    metadata: ChunkMetadata {
                        source_url: optional_value(source_urls, row),
                        tags: optional_value(tags, row),
                        source_title: optional_value(source_titles, row),
                        author_or_channel: optional_value(authors, row),
                        published_date: optional_value(published_dates, row),
                        entities: optional_value(entities, row),
                    },
                    distance,
                    similarity_score: 1.0 - distance,
                }
            })
            .collect();

        Ok(results)
    }

    /// Number of records; zero when the collection does not exist
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        let Some(table) = self.open_table().await? else {
            return Ok(0);
        };

        table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }

    /// All stored ids, in store order
    #[inline]
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let Some(table) = self.open_table().await? else {
            return Ok(Vec::new());
        };

        let results = table
            .query()
            .select(Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list ids: {}", e)))?;

        Self::collect_stream(results, |batch| {
            let ids = string_column(batch, "id")?;
            Ok((0..batch.num_rows())
                .map(|row| ids.value(row).to_string())
                .collect())
        })
        .await
    }

    /// Drop the collection if it exists
    #[inline]
    pub async fn drop_collection(&mut self) -> Result<()> {
        if self.exists().await? {
            info!("Dropping collection {}", self.table_name);
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
        }
        self.vector_dimension = None;
        Ok(())
    }

    fn attempt_corruption_recovery(db_path: &Path) -> Result<()> {
        warn!("Attempting database corruption recovery at {:?}", db_path);

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {:?}", backup_path);
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                RagError::Database(format!("Failed to remove corrupted database: {}", e))
            })?;
        }

        std::fs::create_dir_all(db_path).map_err(|e| {
            RagError::Database(format!("Failed to recreate vector database directory: {}", e))
        })?;

        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn optional_value(array: &StringArray, row: usize) -> Option<String> {
    (!array.is_null(row)).then(|| array.value(row).to_string())
}
