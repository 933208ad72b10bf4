//! 只读的管理诊断：表清单、列结构、样本行

use crate::{
    error::{AppError, Result},
    models::{
        admin::{ColumnInfo, TableDescription, TableInfo},
        session::SessionContext,
    },
    services::{backend::Query, Database},
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const SAMPLE_ROWS: usize = 5;
const PREVIEW_CHARS: usize = 100;

#[derive(Clone)]
pub struct InspectorService {
    db: Arc<Database>,
}

fn cut(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// 样本行预览：长字符串截断，数组和对象编码后截断
pub fn preview_row(row: Value) -> Value {
    match row {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(key, value)| {
                    let shown = match value {
                        Value::String(s) if s.chars().count() > PREVIEW_CHARS => json!(cut(&s)),
                        Value::Array(_) | Value::Object(_) => json!(cut(&value.to_string())),
                        other => other,
                    };
                    (key, shown)
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

pub fn render_columns(table_name: &str, columns: &[ColumnInfo]) -> String {
    let mut text = format!("\n=== {} 테이블 구조 ===\n", table_name);
    if columns.is_empty() {
        text.push_str("(스키마 정보 없음)\n");
    }
    for column in columns {
        text.push_str(&format!(
            "- {} ({}, nullable: {}, default: {})\n",
            column.column_name,
            column.data_type,
            column.is_nullable,
            column.column_default.as_deref().filter(|d| !d.is_empty()).unwrap_or("없음")
        ));
    }
    text
}

impl InspectorService {
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    fn require_admin(session: &SessionContext) -> Result<()> {
        if session.is_admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Administrator access required"))
        }
    }

    pub async fn list_tables(&self, session: &SessionContext) -> Result<Vec<TableInfo>> {
        Self::require_admin(session)?;
        self.db.rpc("get_schema_info", json!({})).await
    }

    async fn columns(&self, table_name: &str) -> Result<Vec<ColumnInfo>> {
        self.db
            .rpc("get_table_columns", json!({ "p_table_name": table_name }))
            .await
    }

    pub async fn describe_table(&self, session: &SessionContext, table_name: &str) -> Result<TableDescription> {
        Self::require_admin(session)?;
        debug!("Describing table {}", table_name);

        let columns = self.columns(table_name).await?;
        if columns.is_empty() {
            return Err(AppError::not_found("Table"));
        }
        let sample_rows = self
            .db
            .select_raw(table_name, &Query::new().limit(SAMPLE_ROWS))
            .await?
            .into_iter()
            .map(preview_row)
            .collect();

        Ok(TableDescription {
            table_name: table_name.to_string(),
            columns,
            sample_rows,
        })
    }

    /// 所有表结构的文本
    pub async fn schema_text(&self, session: &SessionContext) -> Result<String> {
        let tables = self.list_tables(session).await?;
        if tables.is_empty() {
            return Ok("테이블이 없습니다.".to_string());
        }

        let mut text = String::new();
        for table in &tables {
            match self.columns(&table.table_name).await {
                Ok(columns) => text.push_str(&render_columns(&table.table_name, &columns)),
                Err(e) => {
                    warn!("Failed to read columns of {}: {}", table.table_name, e);
                    text.push_str(&format!(
                        "\n[{}] 테이블 스키마 정보를 가져올 수 없습니다.\n",
                        table.table_name
                    ));
                }
            }
        }
        Ok(text.trim().to_string())
    }
}
