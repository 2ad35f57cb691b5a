// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU collector for cgroup v1 hierarchies
//!
//! Reads the raw CPU accounting files of the current cgroup, computes the CPU limit and publishes
//! them as a `cpu` subtree:
//! - `cpu.usage_ns`: cumulative CPU time consumed, in nanoseconds
//! - `cpu.cpu_count`: number of CPUs in the cpuset
//! - `cpu.limit_nanocores`: min(cpuset, CFS quota), in nanocores (1 core = 1,000,000,000)
//! - `cpu.limit_defaulted`: 1 when no limit was found and the host CPU count was used
//!
//! Missing files only remove the values derived from them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use metrics_core::config::{optional, Options};
use metrics_core::dispatcher::Dispatcher;
use metrics_core::errors::Creation;
use metrics_core::flatten::flatten;
use metrics_core::metric::now;
use metrics_core::tree::{Tree, Value};
use metrics_core::util::sanitize_prefix;
use tracing::debug;

use crate::collector::Collector;

const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";
const CPU_USAGE_FILE: &str = "cpu/cpuacct.usage"; // Total CPU time, in nanoseconds, consumed by all tasks in this cgroup
const CPUSET_CPUS_FILE: &str = "cpuset/cpuset.cpus"; // CPUs that tasks in this cgroup may use
const CPU_PERIOD_FILE: &str = "cpu/cpu.cfs_period_us"; // How often, in microseconds, CPU access is reallocated
const CPU_QUOTA_FILE: &str = "cpu/cpu.cfs_quota_us"; // CPU time, in microseconds, tasks may use per period

const NANOCORES_PER_CPU: f64 = 1_000_000_000.0;

/// Statistics from cgroup v1 files, normalized to nanoseconds
#[derive(Debug, Default, PartialEq)]
struct CgroupStats {
    total: Option<u64>,            // Cumulative CPU usage in nanoseconds
    cpu_count: Option<u64>,        // Number of accessible logical CPUs
    scheduler_period: Option<u64>, // CFS scheduler period in nanoseconds
    scheduler_quota: Option<u64>,  // CFS scheduler quota in nanoseconds
}

fn read_u64(path: &Path) -> Option<u64> {
    let value = fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse::<u64>().ok());
    if value.is_none() {
        debug!("Could not read {}", path.display());
    }
    value
}

/// Reads raw CPU statistics under `root` and converts them to nanoseconds
fn read_cgroup_stats(root: &Path) -> CgroupStats {
    let total = read_u64(&root.join(CPU_USAGE_FILE));

    let cpuset_path = root.join(CPUSET_CPUS_FILE);
    let cpu_count = match read_cpu_count_from_file(&cpuset_path) {
        Ok(count) => Some(count),
        Err(e) => {
            debug!("Could not read CPU count from {}: {}", cpuset_path.display(), e);
            None
        }
    };

    let scheduler_period = read_u64(&root.join(CPU_PERIOD_FILE)).and_then(micros_to_nanos);

    let quota_path = root.join(CPU_QUOTA_FILE);
    let scheduler_quota = fs::read_to_string(&quota_path)
        .ok()
        .and_then(|contents| contents.trim().parse::<i64>().ok())
        .and_then(|quota| {
            // -1 means unlimited
            if quota < 0 {
                debug!("CFS scheduler quota is {}, treating as unlimited", quota);
                None
            } else {
                micros_to_nanos(quota as u64)
            }
        });

    CgroupStats {
        total,
        cpu_count,
        scheduler_period,
        scheduler_quota,
    }
}

/// Converts microseconds to nanoseconds; a value too large to convert counts as missing.
fn micros_to_nanos(micros: u64) -> Option<u64> {
    let nanos = micros.checked_mul(1000);
    if nanos.is_none() {
        debug!("Ignoring out of range value {} us", micros);
    }
    nanos
}

/// Reads the CPU count from a cpuset list
///
/// The list is comma-separated, with dashes for ranges: "0-2,16" is CPUs 0, 1, 2 and 16, a
/// count of 4.
fn read_cpu_count_from_file(path: &Path) -> Result<u64, io::Error> {
    let contents = fs::read_to_string(path)?;
    parse_cpuset(contents.trim())
}

fn parse_cpuset(cpuset: &str) -> Result<u64, io::Error> {
    if cpuset.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "cpuset is empty"));
    }

    let parse_cpu = |raw: &str| {
        raw.trim().parse::<u64>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse CPU id {raw:?}: {e}"),
            )
        })
    };

    let mut cpu_count: u64 = 0;
    for part in cpuset.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_cpu(start)?, parse_cpu(end)?);
                if end < start {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Invalid CPU range {part:?}"),
                    ));
                }
                cpu_count += end - start + 1;
            }
            None => {
                parse_cpu(part)?;
                cpu_count += 1;
            }
        }
    }
    Ok(cpu_count)
}

/// Computes the CPU limit in nanocores from cgroup statistics, using min(cpuset, CFS quota)
fn compute_cgroup_cpu_limit_nc(stats: &CgroupStats, host_cpu_count: u64) -> Option<f64> {
    let mut limit_nc = None;

    if let Some(cpu_count) = stats.cpu_count {
        if cpu_count != host_cpu_count {
            limit_nc = Some(cpu_count as f64 * NANOCORES_PER_CPU);
        }
    }

    if let (Some(quota), Some(period)) = (stats.scheduler_quota, stats.scheduler_period) {
        if period > 0 {
            let quota_limit_nc = NANOCORES_PER_CPU * (quota as f64 / period as f64);
            if limit_nc.map_or(true, |current| quota_limit_nc < current) {
                limit_nc = Some(quota_limit_nc);
            }
        }
    }
    limit_nc
}

/// Builds the `cpu` measurement tree
fn build_cpu_tree(stats: &CgroupStats, host_cpu_count: u64) -> Tree {
    let mut cpu = Tree::new();
    if let Some(total) = stats.total {
        let usage = match i64::try_from(total) {
            Ok(total) => Value::from(total),
            Err(_) => Value::from(total as f64),
        };
        cpu.insert("usage_ns".to_string(), usage);
    }
    if let Some(count) = stats.cpu_count {
        cpu.insert("cpu_count".to_string(), Value::from(count as i64));
    }

    let (limit, defaulted) = match compute_cgroup_cpu_limit_nc(stats, host_cpu_count) {
        Some(limit) => (limit, false),
        None => (host_cpu_count as f64 * NANOCORES_PER_CPU, true),
    };
    cpu.insert("limit_nanocores".to_string(), Value::from(limit));
    cpu.insert(
        "limit_defaulted".to_string(),
        Value::from(i64::from(defaulted)),
    );

    let mut tree = Tree::new();
    tree.insert("cpu".to_string(), Value::Subtree(cpu));
    tree
}

pub struct CgroupCpuCollector {
    name: String,
    root: PathBuf,
    prefix: String,
    dispatcher: Dispatcher,
}

impl CgroupCpuCollector {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        prefix: &str,
        dispatcher: Dispatcher,
    ) -> Self {
        CgroupCpuCollector {
            name: name.into(),
            root: root.into(),
            prefix: sanitize_prefix(prefix),
            dispatcher,
        }
    }

    /// Reads the optional `root` (default `/sys/fs/cgroup`) and `prefix` options.
    pub fn from_options(
        name: impl Into<String>,
        options: &Options,
        dispatcher: Dispatcher,
    ) -> Result<Self, Creation> {
        let root = optional(options, "root").unwrap_or(DEFAULT_CGROUP_ROOT);
        let prefix = optional(options, "prefix").unwrap_or_default();
        Ok(Self::new(name, root, prefix, dispatcher))
    }
}

#[async_trait]
impl Collector for CgroupCpuCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) {
        let timestamp = now();
        let stats = read_cgroup_stats(&self.root);
        if stats.total.is_none() {
            debug!(
                "{}: skipping CPU metrics, no usage found under {}",
                self.name,
                self.root.display()
            );
            return;
        }
        let tree = build_cpu_tree(&stats, num_cpus::get() as u64);
        let published = self
            .dispatcher
            .publish_all(&flatten(&tree, &self.prefix, timestamp));
        debug!("{}: published {} metrics", self.name, published);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use metrics_core::metric::MetricValue;
    use std::collections::BTreeMap;

    fn write(root: &Path, file: &str, contents: &str) {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_parse_cpuset() {
        assert_eq!(parse_cpuset("0-2,16").unwrap(), 4);
        assert_eq!(parse_cpuset("3").unwrap(), 1);
        assert_eq!(parse_cpuset("0-7").unwrap(), 8);
        assert!(parse_cpuset("").is_err());
        assert!(parse_cpuset("a-b").is_err());
        assert!(parse_cpuset("4-2").is_err());
    }

    #[test]
    fn test_read_cgroup_stats() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPU_USAGE_FILE, "123456789\n");
        write(dir.path(), CPUSET_CPUS_FILE, "0-1\n");
        write(dir.path(), CPU_PERIOD_FILE, "100000\n");
        write(dir.path(), CPU_QUOTA_FILE, "-1\n");

        assert_eq!(
            read_cgroup_stats(dir.path()),
            CgroupStats {
                total: Some(123456789),
                cpu_count: Some(2),
                scheduler_period: Some(100_000_000),
                scheduler_quota: None,
            }
        );
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_cgroup_stats(dir.path()), CgroupStats::default());
    }

    #[test]
    fn test_limit_is_min_of_cpuset_and_quota() {
        let stats = CgroupStats {
            total: Some(1),
            cpu_count: Some(4),
            scheduler_period: Some(100_000_000),
            scheduler_quota: Some(150_000_000),
        };
        assert_eq!(compute_cgroup_cpu_limit_nc(&stats, 16), Some(1.5e9));

        let stats = CgroupStats {
            scheduler_quota: Some(800_000_000),
            ..stats
        };
        assert_eq!(compute_cgroup_cpu_limit_nc(&stats, 16), Some(4.0e9));
    }

    #[test]
    fn test_cpuset_equal_to_host_is_not_a_limit() {
        let stats = CgroupStats {
            total: Some(1),
            cpu_count: Some(8),
            ..Default::default()
        };
        assert_eq!(compute_cgroup_cpu_limit_nc(&stats, 8), None);
    }

    #[test]
    fn test_build_cpu_tree_defaults_limit_to_host() {
        let stats = CgroupStats {
            total: Some(500),
            cpu_count: Some(2),
            ..Default::default()
        };

        let metrics = flatten(&build_cpu_tree(&stats, 2), "container", 0);
        let by_path: BTreeMap<&str, &MetricValue> =
            metrics.iter().map(|m| (m.path(), m.value())).collect();

        assert_eq!(
            by_path.get("container.cpu.usage_ns"),
            Some(&&MetricValue::Int(500))
        );
        assert_eq!(
            by_path.get("container.cpu.cpu_count"),
            Some(&&MetricValue::Int(2))
        );
        assert_eq!(
            by_path.get("container.cpu.limit_nanocores"),
            Some(&&MetricValue::Float(2.0e9))
        );
        assert_eq!(
            by_path.get("container.cpu.limit_defaulted"),
            Some(&&MetricValue::Int(1))
        );
    }

    #[test]
    fn test_usage_above_f64_precision_is_exact() {
        let total = (1u64 << 53) + 1;
        let stats = CgroupStats {
            total: Some(total),
            ..Default::default()
        };

        let metrics = flatten(&build_cpu_tree(&stats, 1), "", 0);
        let usage = metrics
            .iter()
            .find(|m| m.path() == "cpu.usage_ns")
            .unwrap();

        assert_eq!(usage.value(), &MetricValue::Int(9_007_199_254_740_993));
    }

    #[test]
    fn test_out_of_range_scheduler_values_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let huge = (u64::MAX / 10).to_string();
        write(dir.path(), CPU_PERIOD_FILE, &huge);
        write(dir.path(), CPU_QUOTA_FILE, &i64::MAX.to_string());

        let stats = read_cgroup_stats(dir.path());
        assert_eq!(stats.scheduler_period, None);
        assert_eq!(stats.scheduler_quota, None);
        assert_eq!(micros_to_nanos(100_000), Some(100_000_000));
    }
}
