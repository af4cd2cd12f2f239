// 数据库迁移模块
// 版本化 SQL 迁移、校验和与架构验证

use crate::errors::AccessError;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

pub mod migrations;
pub mod seed_data;

pub use migrations::*;
pub use seed_data::*;

/// 访问控制依赖的表
pub const REQUIRED_TABLES: [&str; 5] = [
    "subscription_tiers",
    "tenants",
    "tenant_ai_overrides",
    "ai_usage_counters",
    "ai_usage_legacy",
];

/// 迁移信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    pub version: String,
    pub name: String,
    pub description: String,
    pub up_sql: String,
    pub down_sql: String,
}

/// 迁移状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub version: String,
    pub name: String,
    pub applied_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_applied: bool,
    pub checksum: String,
    /// 已应用迁移的校验和与当前定义不一致
    pub checksum_mismatch: bool,
}

/// 架构验证结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaValidation {
    pub is_valid: bool,
    pub missing_tables: Vec<String>,
}

/// 迁移管理器
pub struct MigrationManager {
    db: DatabaseConnection,
}

impl MigrationManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    /// 创建迁移记录表
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<(), AccessError> {
        let create_migrations_table = r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version VARCHAR(255) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                checksum VARCHAR(64) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                execution_time_ms INTEGER NOT NULL DEFAULT 0
            )
        "#;

        self.execute_sql(&self.db, create_migrations_table).await?;
        info!("迁移系统初始化完成");
        Ok(())
    }

    pub fn get_available_migrations(&self) -> Vec<Migration> {
        migrations::get_all_migrations()
    }

    #[instrument(skip(self))]
    pub async fn get_applied_migrations(&self) -> Result<Vec<MigrationStatus>, AccessError> {
        let query = "SELECT version, name, applied_at, checksum FROM schema_migrations ORDER BY version";
        let rows = self
            .db
            .query_all(Statement::from_string(self.backend(), query.to_string()))
            .await?;

        let mut applied = Vec::with_capacity(rows.len());
        for row in rows {
            applied.push(MigrationStatus {
                version: row.try_get("", "version")?,
                name: row.try_get("", "name")?,
                applied_at: Some(row.try_get("", "applied_at")?),
                is_applied: true,
                checksum: row.try_get("", "checksum")?,
                checksum_mismatch: false,
            });
        }
        Ok(applied)
    }

    /// 对比已应用记录与当前迁移定义
    #[instrument(skip(self))]
    pub async fn check_status(&self) -> Result<Vec<MigrationStatus>, AccessError> {
        let applied: HashMap<String, MigrationStatus> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|status| (status.version.clone(), status))
            .collect();

        let status = self
            .get_available_migrations()
            .into_iter()
            .map(|migration| {
                let checksum = calculate_checksum(&migration);
                match applied.get(&migration.version) {
                    Some(record) => {
                        let checksum_mismatch = record.checksum != checksum;
                        if checksum_mismatch {
                            warn!(version = %migration.version, "迁移校验和不匹配，可能已被修改");
                        }
                        MigrationStatus {
                            checksum_mismatch,
                            ..record.clone()
                        }
                    }
                    None => MigrationStatus {
                        version: migration.version,
                        name: migration.name,
                        applied_at: None,
                        is_applied: false,
                        checksum,
                        checksum_mismatch: false,
                    },
                }
            })
            .collect();

        Ok(status)
    }

    /// 按版本顺序应用待处理的迁移，返回本次应用的版本
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<Vec<String>, AccessError> {
        self.init().await?;

        let pending: Vec<String> = self
            .check_status()
            .await?
            .into_iter()
            .filter(|status| !status.is_applied)
            .map(|status| status.version)
            .collect();

        let mut applied = Vec::new();
        for migration in self.get_available_migrations() {
            if pending.contains(&migration.version) {
                self.apply_migration(&migration).await?;
                applied.push(migration.version);
            }
        }

        if applied.is_empty() {
            info!("没有待处理的迁移");
        } else {
            info!(count = applied.len(), "迁移应用完成");
        }
        Ok(applied)
    }

    #[instrument(skip(self, migration), fields(version = %migration.version))]
    async fn apply_migration(&self, migration: &Migration) -> Result<(), AccessError> {
        info!(name = %migration.name, "应用迁移");
        let started = std::time::Instant::now();

        let txn = self.db.begin().await?;
        if let Err(e) = self.execute_sql(&txn, &migration.up_sql).await {
            txn.rollback().await?;
            return Err(AccessError::database(format!("迁移 {} 执行失败: {}", migration.version, e)));
        }

        let execution_time_ms = started.elapsed().as_millis() as i32;
        let record = Statement::from_sql_and_values(
            self.backend(),
            "INSERT INTO schema_migrations (version, name, description, checksum, execution_time_ms) \
             VALUES ($1, $2, $3, $4, $5)",
            vec![
                Value::from(migration.version.clone()),
                Value::from(migration.name.clone()),
                Value::from(migration.description.clone()),
                Value::from(calculate_checksum(migration)),
                Value::from(execution_time_ms),
            ],
        );
        if let Err(e) = txn.execute(record).await {
            txn.rollback().await?;
            return Err(AccessError::database(format!("记录迁移 {} 失败: {}", migration.version, e)));
        }

        txn.commit().await?;
        info!(execution_time_ms, "迁移应用成功");
        Ok(())
    }

    /// 回滚单个迁移
    #[instrument(skip(self))]
    pub async fn rollback(&self, version: &str) -> Result<(), AccessError> {
        let migration = self
            .get_available_migrations()
            .into_iter()
            .find(|migration| migration.version == version)
            .ok_or_else(|| AccessError::not_found(format!("迁移 {}", version)))?;

        warn!(version = %version, "回滚数据库迁移");
        let txn = self.db.begin().await?;
        if let Err(e) = self.execute_sql(&txn, &migration.down_sql).await {
            txn.rollback().await?;
            return Err(AccessError::database(format!("迁移 {} 回滚失败: {}", version, e)));
        }

        txn.execute(Statement::from_sql_and_values(
            self.backend(),
            "DELETE FROM schema_migrations WHERE version = $1",
            vec![Value::from(version.to_string())],
        ))
        .await?;

        txn.commit().await?;
        info!(version = %version, "迁移回滚完成");
        Ok(())
    }

    /// 检查访问控制依赖的表是否齐全
    #[instrument(skip(self))]
    pub async fn validate_schema(&self) -> Result<SchemaValidation, AccessError> {
        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }

        let validation = SchemaValidation {
            is_valid: missing_tables.is_empty(),
            missing_tables,
        };
        if validation.is_valid {
            info!("数据库架构验证通过");
        } else {
            warn!(missing = ?validation.missing_tables, "数据库架构缺少必需的表");
        }
        Ok(validation)
    }

    /// 按分号拆分后逐条执行
    async fn execute_sql<C: ConnectionTrait>(&self, conn: &C, sql: &str) -> Result<(), AccessError> {
        for statement in split_statements(sql) {
            conn.execute(Statement::from_string(self.backend(), statement.to_string()))
                .await?;
        }
        Ok(())
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, AccessError> {
        let query = match self.backend() {
            DbBackend::Sqlite => "SELECT COUNT(*) > 0 AS present FROM sqlite_master WHERE type = 'table' AND name = $1",
            _ => "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1) AS present",
        };

        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                self.backend(),
                query,
                vec![Value::from(table_name.to_string())],
            ))
            .await?;

        Ok(row.and_then(|row| row.try_get::<bool>("", "present").ok()).unwrap_or(false))
    }
}

/// 迁移校验和（up 与 down 脚本的 SHA-256）
pub fn calculate_checksum(migration: &Migration) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(migration.up_sql.as_bytes());
    hasher.update(migration.down_sql.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}
