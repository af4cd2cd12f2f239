// 数据库管理与访问控制调试 CLI
// 迁移、种子数据，以及针对真实数据库的配置解析、访问检查与用量查询

use crate::access::AccessGate;
use crate::config::{AppConfig, ConfigLoader};
use crate::db::migrations::{MigrationManager, SeedDataManager};
use crate::db::{DatabaseConfigStore, DatabaseManager};
use crate::errors::AccessError;
use ai_access_common::{AccessFeatureKey, TenantId, UserId};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// CLI 命令
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Migration(MigrationCommand),
    /// 打印配置摘要，不连接数据库
    Config,
    /// 写入标准订阅等级
    Seed { demo_tenants: bool },
    /// 输出租户的最终 AI 配置
    Resolve { tenant_id: Option<TenantId> },
    /// 执行一次访问检查
    Check {
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
        action: Option<String>,
    },
    /// 记录一次用量
    Record {
        tenant_id: Option<TenantId>,
        user_id: UserId,
        feature: AccessFeatureKey,
    },
    /// 查询用量；不带用户时输出租户汇总
    Usage {
        tenant_id: TenantId,
        user: Option<(UserId, AccessFeatureKey)>,
    },
}

/// 迁移命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    Status,
    Migrate,
    Rollback { version: String },
    Validate,
}

/// CLI 执行器
pub struct CliExecutor {
    config: AppConfig,
    manager: DatabaseManager,
    gate: AccessGate,
}

impl CliExecutor {
    pub async fn new(config: AppConfig) -> Result<Self, AccessError> {
        let manager = DatabaseManager::connect(config.database.clone()).await?;
        let store = Arc::new(DatabaseConfigStore::new(manager.connection().clone()));
        let gate = AccessGate::from_store(store, &config.access);
        Ok(Self { config, manager, gate })
    }

    /// 关闭数据库连接
    pub async fn close(self) -> Result<(), AccessError> {
        self.manager.close().await
    }

    pub async fn execute(&self, command: CliCommand) -> Result<(), AccessError> {
        match command {
            CliCommand::Migration(cmd) => self.execute_migration_command(cmd).await,
            CliCommand::Config => {
                ConfigLoader::print_summary(&self.config);
                Ok(())
            }
            CliCommand::Seed { demo_tenants } => {
                let summary = SeedDataManager::new(self.manager.connection().clone())
                    .seed_all(demo_tenants)
                    .await?;
                for (name, id) in summary.tiers {
                    println!("等级    {:<16} {}", name, id);
                }
                for (name, id) in summary.demo_tenants {
                    println!("租户    {:<16} {}", name, id);
                }
                Ok(())
            }
            CliCommand::Resolve { tenant_id } => {
                let config = self.gate.resolve_config(tenant_id).await;
                println!("plan = {}, source = {:?}", config.plan, config.source);
                print_json(&*config)
            }
            CliCommand::Check {
                tenant_id,
                user_id,
                feature,
                action,
            } => {
                let result = self
                    .gate
                    .check_access(tenant_id, user_id, feature, action.as_deref())
                    .await;
                print_json(&result)
            }
            CliCommand::Record {
                tenant_id,
                user_id,
                feature,
            } => {
                self.gate.increment_usage(tenant_id, user_id, feature).await;
                let status = self.gate.get_usage_status(tenant_id, user_id, feature).await;
                print_json(&status)
            }
            CliCommand::Usage { tenant_id, user } => match user {
                Some((user_id, feature)) => {
                    let status = self.gate.get_usage_status(Some(tenant_id), user_id, feature).await;
                    print_json(&status)
                }
                None => {
                    let usage = self.gate.get_full_usage_status(tenant_id).await;
                    print_json(&usage)?;
                    println!("旧版汇总: {}", self.gate.legacy_monthly_usage(tenant_id).await);
                    Ok(())
                }
            },
        }
    }

    async fn execute_migration_command(&self, command: MigrationCommand) -> Result<(), AccessError> {
        let manager = MigrationManager::new(self.manager.connection().clone());

        match command {
            MigrationCommand::Status => {
                manager.init().await?;
                println!("{:<20} {:<36} {:<10} {:<20}", "版本", "名称", "状态", "应用时间");
                println!("{}", "-".repeat(90));
                for migration in manager.check_status().await? {
                    let status = match (migration.is_applied, migration.checksum_mismatch) {
                        (true, true) => "校验和不符",
                        (true, false) => "已应用",
                        (false, _) => "待应用",
                    };
                    let applied_at = migration
                        .applied_at
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<20} {:<36} {:<10} {:<20}",
                        migration.version, migration.name, status, applied_at
                    );
                }
            }
            MigrationCommand::Migrate => {
                let applied = manager.migrate().await?;
                if applied.is_empty() {
                    println!("没有待应用的迁移");
                } else {
                    println!("成功应用 {} 个迁移:", applied.len());
                    for version in applied {
                        println!("  - {}", version);
                    }
                }
            }
            MigrationCommand::Rollback { version } => {
                manager.rollback(&version).await?;
                println!("迁移 {} 回滚完成", version);
            }
            MigrationCommand::Validate => {
                let validation = manager.validate_schema().await?;
                if validation.is_valid {
                    println!("数据库架构验证通过");
                } else {
                    println!("数据库架构缺少以下表:");
                    for table in validation.missing_tables {
                        println!("  - {}", table);
                    }
                }
            }
        }

        info!("迁移命令执行完成");
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AccessError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `system` 表示系统操作员
fn parse_tenant(value: &str) -> Result<Option<TenantId>, AccessError> {
    if value.eq_ignore_ascii_case("system") {
        return Ok(None);
    }
    parse_uuid("tenant_id", value).map(Some)
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, AccessError> {
    Uuid::parse_str(value).map_err(|_| AccessError::validation(field, format!("无效的 UUID: {}", value)))
}

fn parse_feature(value: &str) -> Result<AccessFeatureKey, AccessError> {
    value
        .parse::<AccessFeatureKey>()
        .map_err(|_| AccessError::validation("feature", format!("未知的 AI 功能: {}", value)))
}

fn required<'a>(args: &'a [String], index: usize, field: &str) -> Result<&'a str, AccessError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| AccessError::validation(field, format!("缺少参数 <{}>", field)))
}

/// 解析命令行参数（`args[0]` 为程序名）
pub fn parse_args(args: &[String]) -> Result<CliCommand, AccessError> {
    let command = required(args, 1, "command")?;

    match command {
        "migration" | "migrate" => {
            let subcommand = match args.get(2).map(String::as_str).unwrap_or("up") {
                "status" => MigrationCommand::Status,
                "up" | "migrate" => MigrationCommand::Migrate,
                "rollback" | "down" => MigrationCommand::Rollback {
                    version: required(args, 3, "version")?.to_string(),
                },
                "validate" => MigrationCommand::Validate,
                other => {
                    return Err(AccessError::validation(
                        "migration",
                        format!("未知的迁移子命令: {}", other),
                    ));
                }
            };
            Ok(CliCommand::Migration(subcommand))
        }
        "status" => Ok(CliCommand::Migration(MigrationCommand::Status)),
        "config" => Ok(CliCommand::Config),
        "seed" => Ok(CliCommand::Seed {
            demo_tenants: args.iter().any(|arg| arg == "--demo"),
        }),
        "resolve" => Ok(CliCommand::Resolve {
            tenant_id: parse_tenant(required(args, 2, "tenant_id")?)?,
        }),
        "check" => Ok(CliCommand::Check {
            tenant_id: parse_tenant(required(args, 2, "tenant_id")?)?,
            user_id: parse_uuid("user_id", required(args, 3, "user_id")?)?,
            feature: parse_feature(required(args, 4, "feature")?)?,
            action: args.get(5).cloned(),
        }),
        "record" => Ok(CliCommand::Record {
            tenant_id: parse_tenant(required(args, 2, "tenant_id")?)?,
            user_id: parse_uuid("user_id", required(args, 3, "user_id")?)?,
            feature: parse_feature(required(args, 4, "feature")?)?,
        }),
        "usage" => {
            let tenant_id = parse_uuid("tenant_id", required(args, 2, "tenant_id")?)?;
            let user = match args.get(3) {
                None => None,
                Some(user_id) => Some((
                    parse_uuid("user_id", user_id)?,
                    parse_feature(required(args, 4, "feature")?)?,
                )),
            };
            Ok(CliCommand::Usage { tenant_id, user })
        }
        other => Err(AccessError::validation("command", format!("未知的命令: {}", other))),
    }
}

pub fn print_help() {
    println!("AI 功能访问控制管理工具");
    println!();
    println!("用法:");
    println!("  ai-access-db <命令> [参数]");
    println!();
    println!("迁移:");
    println!("  migrate [up]                     应用待处理的迁移");
    println!("  migrate status | status         查看迁移状态");
    println!("  migrate rollback <version>       回滚指定版本");
    println!("  migrate validate                 验证数据库架构");
    println!();
    println!("数据:");
    println!("  seed [--demo]                    写入标准订阅等级（可选示例租户）");
    println!("  config                           打印配置摘要");
    println!();
    println!("访问控制:");
    println!("  resolve <tenant|system>                        输出最终 AI 配置");
    println!("  check <tenant|system> <user> <feature> [action] 执行访问检查");
    println!("  record <tenant|system> <user> <feature>         记录一次用量");
    println!("  usage <tenant> [<user> <feature>]               查询本月用量");
    println!();
    println!("功能: student_coaching, project_scoping, portfolio_intelligence,");
    println!("      talent_insights, institutional_analytics");
}
