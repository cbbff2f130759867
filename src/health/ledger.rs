//! 可用性账本
//!
//! 按域名累计健康/异常探测次数，并生成可用性快照。计数器只增不减，
//! 域名在启动时一次性注册，运行期间不会删除。

use crate::config::EndpointSpec;
use crate::error::LedgerError;
use crate::health::domain::resolve_domain;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 单个域名的累计计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCounters {
    /// 健康次数
    pub up: u64,
    /// 异常次数
    pub down: u64,
}

impl DomainCounters {
    /// 已完成的探测总数
    pub fn total(&self) -> u64 {
        self.up + self.down
    }

    /// 可用性百分比（取最接近的整数，恰好 .5 时取偶数），没有任何记录时为空
    pub fn availability_percent(&self) -> Option<u8> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let scaled = self.up * 100;
        let (quotient, remainder) = (scaled / total, scaled % total);
        // 恰好 .5 时取偶数
        let percent = match (remainder * 2).cmp(&total) {
            Ordering::Greater => quotient + 1,
            Ordering::Equal => quotient + quotient % 2,
            Ordering::Less => quotient,
        };
        Some(percent.min(100) as u8)
    }
}

/// 快照中的单个域名条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAvailability {
    /// 健康次数
    pub up: u64,
    /// 异常次数
    pub down: u64,
    /// 可用性百分比，范围 [0, 100]
    pub percent: u8,
}

/// 可用性快照：域名到可用性的有序映射，不包含尚无记录的域名
pub type AvailabilitySnapshot = BTreeMap<String, DomainAvailability>;

/// 可用性账本
///
/// `record` 可被多个并发探测同时调用，计数器的读改写在互斥锁内完成。
#[derive(Debug, Default)]
pub struct AvailabilityLedger {
    counters: Mutex<HashMap<String, DomainCounters>>,
}

impl AvailabilityLedger {
    /// 创建空账本
    pub fn new() -> Self {
        Self::default()
    }

    /// 从端点集合构建账本，为每个可解析的域名注册计数器
    ///
    /// 无法解析的端点跳过，它们在检测时作为解析错误单独上报。
    pub fn from_endpoints(endpoints: &[EndpointSpec]) -> Self {
        let ledger = Self::new();
        for endpoint in endpoints {
            match resolve_domain(&endpoint.url) {
                Ok(domain) => ledger.register(&domain),
                Err(e) => {
                    tracing::debug!("端点 {} 未注册到可用性账本: {}", endpoint.name, e);
                }
            }
        }
        tracing::debug!("可用性账本已初始化，域名数量: {}", ledger.len());
        ledger
    }

    /// 注册域名，已存在时不做任何改变
    pub fn register(&self, domain: &str) {
        self.lock().entry(domain.to_string()).or_default();
    }

    /// 记录一次探测结果
    ///
    /// 域名未注册时返回错误且不创建计数器，调用方应上报该错误并继续运行。
    pub fn record(&self, domain: &str, healthy: bool) -> Result<DomainCounters, LedgerError> {
        let mut counters = self.lock();
        let entry = counters
            .get_mut(domain)
            .ok_or_else(|| LedgerError::UnregisteredDomain {
                domain: domain.to_string(),
            })?;

        if healthy {
            entry.up += 1;
        } else {
            entry.down += 1;
        }
        Ok(*entry)
    }

    /// 当前可用性快照
    ///
    /// 只包含至少有一次记录的域名；没有中间写入时多次调用结果相同。
    pub fn snapshot(&self) -> AvailabilitySnapshot {
        self.lock()
            .iter()
            .filter_map(|(domain, counters)| {
                counters.availability_percent().map(|percent| {
                    (
                        domain.clone(),
                        DomainAvailability {
                            up: counters.up,
                            down: counters.down,
                            percent,
                        },
                    )
                })
            })
            .collect()
    }

    /// 读取单个域名的计数
    pub fn counters(&self, domain: &str) -> Option<DomainCounters> {
        self.lock().get(domain).copied()
    }

    /// 已注册的域名（有序）
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.lock().keys().cloned().collect();
        domains.sort();
        domains
    }

    /// 已注册的域名数量
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 账本是否为空
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // 计数器更新不会在持锁期间 panic，中毒时直接沿用内部数据
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainCounters>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
