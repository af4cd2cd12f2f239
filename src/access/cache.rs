// 租户配置缓存
// 进程内缓存，条目自写入起按固定有效期过期，查找时惰性淘汰

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

use ai_access_common::TenantId;

use super::ai_config::TenantAiConfig;

/// 默认有效期：5 分钟
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    config: Arc<TenantAiConfig>,
    inserted_at: Instant,
}

/// 按租户缓存已解析的配置
///
/// 不做跨进程失效：其他进程写入的覆盖项最多在一个有效期后可见。
#[derive(Debug)]
pub struct ConfigCache {
    ttl: Duration,
    entries: RwLock<HashMap<TenantId, CacheEntry>>,
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 读取未过期的条目；过期条目在此处删除
    pub fn get(&self, tenant_id: TenantId) -> Option<Arc<TenantAiConfig>> {
        {
            let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            match entries.get(&tenant_id) {
                None => return None,
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.config.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        // 释放读锁期间可能已被重新写入
        if let Some(entry) = entries.get(&tenant_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.config.clone());
            }
            entries.remove(&tenant_id);
            debug!(tenant_id = %tenant_id, "配置缓存条目过期，已淘汰");
        }
        None
    }

    pub fn put(&self, tenant_id: TenantId, config: Arc<TenantAiConfig>) {
        let entry = CacheEntry {
            config,
            inserted_at: Instant::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(tenant_id, entry);
    }

    /// 删除单个租户的条目
    pub fn invalidate(&self, tenant_id: TenantId) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&tenant_id);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// 当前条目数（含尚未被惰性淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::types::PlanTier;
    use uuid::Uuid;

    fn config(plan: PlanTier) -> Arc<TenantAiConfig> {
        Arc::new(TenantAiConfig::for_plan(plan))
    }

    #[test]
    fn test_put_and_get() {
        let cache = ConfigCache::default();
        let tenant_id = Uuid::new_v4();

        assert!(cache.get(tenant_id).is_none());
        cache.put(tenant_id, config(PlanTier::Professional));

        let cached = cache.get(tenant_id).unwrap();
        assert_eq!(cached.plan, PlanTier::Professional);
        assert_eq!(cache.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_entries_expire_from_insertion() {
        let cache = ConfigCache::new(Duration::from_millis(200));
        let tenant_id = Uuid::new_v4();
        cache.put(tenant_id, config(PlanTier::Starter));

        // 读取不会延长有效期
        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get(tenant_id).is_some());
        std::thread::sleep(Duration::from_millis(200));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(tenant_id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = ConfigCache::new(Duration::ZERO);
        let tenant_id = Uuid::new_v4();
        cache.put(tenant_id, config(PlanTier::Starter));
        assert!(cache.get(tenant_id).is_none());
    }

    #[test]
    fn test_clear_and_invalidate() {
        let cache = ConfigCache::default();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        cache.put(first, config(PlanTier::Starter));
        cache.put(second, config(PlanTier::Enterprise));

        cache.invalidate(first);
        assert!(cache.get(first).is_none());
        assert!(cache.get(second).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
