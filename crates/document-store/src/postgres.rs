use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

use crate::document::require_object;
use crate::{
    AggregateRow, Aggregation, DocumentId, DocumentStore, Filter, ListOptions, Result, StoreError,
};

/// PostgreSQL-backed document store.
///
/// Documents live in a single JSONB table partitioned by `namespace`, so
/// several services can point at the same database without seeing each
/// other's records.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
    namespace: String,
}

impl PostgresDocumentStore {
    /// Creates a store scoped to a namespace (usually the owning service).
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn create(&self, kind: &str, body: Value) -> Result<DocumentId> {
        let body = require_object(kind, body)?;
        let id = DocumentId::new();

        sqlx::query(
            r#"
            INSERT INTO documents (id, namespace, kind, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&self.namespace)
        .bind(kind)
        .bind(Value::Object(body))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find(&self, kind: &str, filter: &Filter) -> Result<Option<Value>> {
        let body: Option<Value> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE namespace = $1 AND kind = $2 AND body @> $3
            ORDER BY seq ASC
            LIMIT 1
            "#,
        )
        .bind(&self.namespace)
        .bind(kind)
        .bind(filter.to_json())
        .fetch_optional(&self.pool)
        .await?;

        Ok(body)
    }

    async fn list(&self, kind: &str, filter: &Filter, options: ListOptions) -> Result<Vec<Value>> {
        let mut sql = String::from(
            "SELECT body FROM documents WHERE namespace = $1 AND kind = $2 AND body @> $3",
        );
        if options.newest_first {
            sql.push_str(" ORDER BY seq DESC");
        } else {
            sql.push_str(" ORDER BY seq ASC");
        }
        if options.limit.is_some() {
            sql.push_str(" LIMIT $4");
        }

        let mut query = sqlx::query_scalar::<_, Value>(&sql)
            .bind(&self.namespace)
            .bind(kind)
            .bind(filter.to_json());
        if let Some(limit) = options.limit {
            query = query.bind(limit as i64);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update_fields(
        &self,
        kind: &str,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET body = body || $4
            WHERE seq = (
                SELECT seq FROM documents
                WHERE namespace = $1 AND kind = $2 AND body @> $3
                ORDER BY seq ASC
                LIMIT 1
            )
            "#,
        )
        .bind(&self.namespace)
        .bind(kind)
        .bind(filter.to_json())
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn aggregate(&self, kind: &str, aggregation: &Aggregation) -> Result<Vec<AggregateRow>> {
        // $1..$3 are always bound; optional parts get the following positions.
        let mut param_count = 3;

        let key_expr = match aggregation.group_by {
            Some(_) => {
                param_count += 1;
                format!("body -> ${param_count}")
            }
            None => "NULL::jsonb".to_string(),
        };

        let matching_expr = match aggregation.count_where {
            Some(_) => {
                let field = param_count + 1;
                let value = param_count + 2;
                param_count += 2;
                format!("COUNT(*) FILTER (WHERE body -> ${field} = ${value})")
            }
            None => "0::BIGINT".to_string(),
        };

        let sum_expr = match aggregation.sum_of {
            Some(_) => {
                param_count += 1;
                // Summed as NUMERIC and clamped to the u64 range
                let sum = format!("COALESCE(SUM((body ->> ${param_count})::NUMERIC), 0)");
                format!("GREATEST(LEAST(TRUNC({sum}), {}), 0)::TEXT", u64::MAX)
            }
            None => "'0'::TEXT".to_string(),
        };

        let mut sql = format!(
            "SELECT {key_expr} AS group_key, COUNT(*) AS total, \
             {matching_expr} AS matching, {sum_expr} AS sum \
             FROM documents WHERE namespace = $1 AND kind = $2 AND body @> $3"
        );
        if aggregation.group_by.is_some() {
            sql.push_str(" GROUP BY 1 ORDER BY MIN(seq) ASC");
        }

        let mut query = sqlx::query(&sql)
            .bind(&self.namespace)
            .bind(kind)
            .bind(aggregation.filter.to_json());
        if let Some(field) = &aggregation.group_by {
            query = query.bind(field);
        }
        if let Some((field, value)) = &aggregation.count_where {
            query = query.bind(field).bind(value);
        }
        if let Some(field) = &aggregation.sum_of {
            query = query.bind(field);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| {
                Ok(AggregateRow {
                    key: row.try_get::<Option<Value>, _>("group_key")?,
                    total: row.try_get::<i64, _>("total")? as u64,
                    matching: row.try_get::<i64, _>("matching")? as u64,
                    sum: parse_sum(kind, &row.try_get::<String, _>("sum")?)?,
                })
            })
            .collect()
    }

    async fn clear(&self, kind: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE namespace = $1 AND kind = $2")
            .bind(&self.namespace)
            .bind(kind)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Parses the clamped NUMERIC sum returned as text.
fn parse_sum(kind: &str, text: &str) -> Result<u64> {
    text.parse().map_err(|_| StoreError::InvalidDocument {
        kind: kind.to_string(),
        reason: format!("sum {text} is not an unsigned integer"),
    })
}
