use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::debug;

use super::errors::DatabaseError;
use crate::domain::errors::DomainResult;
use crate::domain::models::OpsCount;
use crate::domain::ports::OpsCountRepository;

pub(crate) const UPSERT_OPS_COUNT_SQL: &str = r"
INSERT INTO ops_counts (
    id,
    auto_ops_rule_id,
    clause_id,
    updated_at,
    ops_event_count,
    evaluation_count,
    feature_id,
    environment_id
) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    auto_ops_rule_id = VALUES(auto_ops_rule_id),
    clause_id = VALUES(clause_id),
    updated_at = VALUES(updated_at),
    ops_event_count = VALUES(ops_event_count),
    evaluation_count = VALUES(evaluation_count),
    feature_id = VALUES(feature_id)
";

/// `MySQL` implementation of `OpsCountRepository`
pub struct MySqlOpsCountRepository {
    pool: MySqlPool,
}

impl MySqlOpsCountRepository {
    /// Repository over an existing pool.
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpsCountRepository for MySqlOpsCountRepository {
    async fn upsert_ops_count(&self, environment_id: &str, ops_count: &OpsCount) -> DomainResult<()> {
        let result = sqlx::query(UPSERT_OPS_COUNT_SQL)
            .bind(&ops_count.id)
            .bind(&ops_count.auto_ops_rule_id)
            .bind(&ops_count.clause_id)
            .bind(ops_count.updated_at)
            .bind(ops_count.ops_event_count)
            .bind(ops_count.evaluation_count)
            .bind(&ops_count.feature_id)
            .bind(environment_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        debug!(
            environment_id,
            rule_id = %ops_count.auto_ops_rule_id,
            clause_id = %ops_count.clause_id,
            rows_affected = result.rows_affected(),
            "Ops count upserted"
        );
        Ok(())
    }
}
