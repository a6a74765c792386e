use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel, error::AppResult, state::AppState};

pub async fn log_audit(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(())
}

/// Record an audit row within the data-store timeout; a failure is logged and otherwise ignored.
pub async fn audit_quietly(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let write = log_audit(state, user_id, action, Some(resource), Some(metadata));
    match tokio::time::timeout(state.config.db_timeout, write).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, action, "audit log failed"),
        Err(_) => tracing::warn!(action, "audit log timed out"),
    }
}
