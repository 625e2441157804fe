// Local vector index backed by LanceDB
// One table per index; the metric travels in the table's schema metadata


use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    IndexRecord, Metric, QueryMatch, QueryRequest, QueryResult, RecordMetadata,
    VectorIndexClient,
};
use crate::{Result, SearchError};

const METRIC_METADATA_KEY: &str = "metric";
const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

fn storage_error(context: &str, error: impl std::fmt::Display) -> SearchError {
    SearchError::IndexService(format!("{context}: {error}"))
}

/// Vector index client storing each index as a LanceDB table on disk
pub struct LanceIndexClient {
    connection: Connection,
}

impl std::fmt::Debug for LanceIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceIndexClient").finish_non_exhaustive()
    }
}

impl LanceIndexClient {
    /// Open (creating if needed) the database directory at `path`
    #[inline]
    pub async fn connect(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| storage_error("Failed to create vector database directory", e))?;

        debug!("Connecting to LanceDB at {}", path.display());

        let uri = path.display().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to connect to LanceDB", e))?;

        info!("Vector database opened at {}", path.display());
        Ok(Self { connection })
    }

    fn create_schema(dimension: u32, metric: Metric) -> SchemaRef {
        let metadata = HashMap::from([(
            METRIC_METADATA_KEY.to_string(),
            metric.as_str().to_string(),
        )]);

        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("id", DataType::Utf8, false),
                Field::new(
                    VECTOR_COLUMN,
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, true)),
                        dimension as i32,
                    ),
                    false,
                ),
                Field::new("source_path", DataType::Utf8, false),
                Field::new("chunk_text", DataType::Utf8, false),
                Field::new("location", DataType::Utf8, false),
                Field::new("extra", DataType::Utf8, false),
            ],
            metadata,
        ))
    }

    async fn open(&self, index_name: &str) -> Result<Table> {
        self.connection
            .open_table(index_name)
            .execute()
            .await
            .map_err(|e| storage_error(&format!("Failed to open index '{index_name}'"), e))
    }

    async fn schema_of(table: &Table) -> Result<SchemaRef> {
        table
            .schema()
            .await
            .map_err(|e| storage_error("Failed to get table schema", e))
    }

    /// Element field and dimension of the vector column
    fn vector_layout(schema: &Schema) -> Result<(Arc<Field>, usize)> {
        match schema
            .field_with_name(VECTOR_COLUMN)
            .map(|field| field.data_type())
        {
            Ok(DataType::FixedSizeList(item, size)) => Ok((Arc::clone(item), *size as usize)),
            _ => Err(SearchError::IndexService(
                "Could not find vector column or determine dimension".to_string(),
            )),
        }
    }

    fn metric_of(schema: &Schema) -> Metric {
        schema
            .metadata()
            .get(METRIC_METADATA_KEY)
            .and_then(|name| Metric::parse(name))
            .unwrap_or_else(|| {
                warn!("Index has no metric metadata, assuming cosine");
                Metric::Cosine
            })
    }

    fn create_record_batch(records: &[IndexRecord], schema: SchemaRef) -> Result<RecordBatch> {
        let (item_field, dimension) = Self::vector_layout(&schema)?;
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);
        let mut source_paths = Vec::with_capacity(len);
        let mut chunk_texts = Vec::with_capacity(len);
        let mut locations = Vec::with_capacity(len);
        let mut extras = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != dimension {
                return Err(SearchError::IndexService(format!(
                    "Vector for '{}' has dimension {}, index expects {}",
                    record.id,
                    record.vector.len(),
                    dimension
                )));
            }

            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            source_paths.push(record.metadata.source_path.as_str());
            chunk_texts.push(record.metadata.chunk_text.as_str());
            locations.push(
                serde_json::to_string(&record.metadata.location)
                    .map_err(|e| storage_error("Failed to encode chunk location", e))?,
            );
            extras.push(Value::Object(record.metadata.extra.clone()).to_string());
        }

        let vector_array = FixedSizeListArray::try_new(
            item_field,
            dimension as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| storage_error("Failed to create vector array", e))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(source_paths)),
            Arc::new(StringArray::from(chunk_texts)),
            Arc::new(StringArray::from(locations)),
            Arc::new(StringArray::from(extras)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| storage_error("Failed to create record batch", e))
    }

    fn parse_batch(
        batch: &RecordBatch,
        metric: Metric,
        request: &QueryRequest<'_>,
    ) -> Result<Vec<QueryMatch>> {
        let ids = string_column(batch, "id")?;
        let source_paths = string_column(batch, "source_path")?;
        let chunk_texts = string_column(batch, "chunk_text")?;
        let locations = string_column(batch, "location")?;
        let extras = string_column(batch, "extra")?;
        let vectors = batch
            .column_by_name(VECTOR_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>());
        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut matches = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .filter(|d| !d.is_null(row))
                .map_or(0.0, |d| d.value(row));

            let metadata = if request.include_metadata {
                let location = serde_json::from_str(locations.value(row))
                    .map_err(|e| storage_error("Invalid chunk location", e))?;
                let extra = match serde_json::from_str::<Value>(extras.value(row)) {
                    Ok(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                Some(RecordMetadata {
                    source_path: source_paths.value(row).to_string(),
                    location,
                    chunk_text: chunk_texts.value(row).to_string(),
                    extra,
                })
            } else {
                None
            };

            let values = if request.include_values {
                vectors.and_then(|v| {
                    let row_values = v.value(row);
                    row_values
                        .as_any()
                        .downcast_ref::<Float32Array>()
                        .map(|f| f.values().to_vec())
                })
            } else {
                None
            };

            matches.push(QueryMatch {
                id: ids.value(row).to_string(),
                score: score_from_distance(metric, distance),
                values,
                metadata,
            });
        }

        Ok(matches)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| SearchError::IndexService(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| SearchError::IndexService(format!("Invalid {name} column type")))
}

fn distance_type(metric: Metric) -> DistanceType {
    match metric {
        Metric::Cosine => DistanceType::Cosine,
        Metric::Euclidean => DistanceType::L2,
        Metric::DotProduct => DistanceType::Dot,
    }
}

/// Convert a LanceDB distance into a score where higher is more similar
fn score_from_distance(metric: Metric, distance: f32) -> f32 {
    match metric {
        Metric::Cosine | Metric::DotProduct => 1.0 - distance,
        Metric::Euclidean => 1.0 / (1.0 + distance),
    }
}

#[async_trait]
impl VectorIndexClient for LanceIndexClient {
    async fn list_index_names(&self) -> Result<HashSet<String>> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| storage_error("Failed to list tables", e))?;
        Ok(names.into_iter().collect())
    }

    async fn create_index(&self, name: &str, dimension: u32, metric: Metric) -> Result<()> {
        let schema = Self::create_schema(dimension, metric);
        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| storage_error(&format!("Failed to create index '{name}'"), e))?;

        info!(
            "Created LanceDB table '{}' with {} dimensions ({})",
            name, dimension, metric
        );
        Ok(())
    }

    async fn upsert(&self, index_name: &str, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }

        let table = self.open(index_name).await?;
        let schema = Self::schema_of(&table).await?;

        let batch = Self::create_record_batch(records, Arc::clone(&schema))?;
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| storage_error("Failed to upsert records", e))?;

        debug!("Upserted {} records into '{}'", records.len(), index_name);
        Ok(())
    }

    async fn query(&self, index_name: &str, request: QueryRequest<'_>) -> Result<QueryResult> {
        let table = self.open(index_name).await?;
        let schema = Self::schema_of(&table).await?;
        let (_, dimension) = Self::vector_layout(&schema)?;
        let metric = Self::metric_of(&schema);

        if request.vector.len() != dimension {
            return Err(SearchError::IndexService(format!(
                "Query vector has dimension {}, index expects {}",
                request.vector.len(),
                dimension
            )));
        }

        debug!(
            "Querying '{}' for top {} matches ({})",
            index_name, request.top_k, metric
        );

        let mut results = table
            .vector_search(request.vector)
            .map_err(|e| storage_error("Failed to create vector search", e))?
            .column(VECTOR_COLUMN)
            .distance_type(distance_type(metric))
            .limit(request.top_k)
            .execute()
            .await
            .map_err(|e| storage_error("Failed to execute search", e))?;

        let mut matches = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| storage_error("Failed to read result stream", e))?
        {
            matches.extend(Self::parse_batch(&batch, metric, &request)?);
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        debug!("Query returned {} matches", matches.len());
        Ok(QueryResult { matches })
    }
}
