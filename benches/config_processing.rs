//! 配置处理基准测试
//!
//! 测试配置解析、验证和域名提取的性能

use criterion::{criterion_group, criterion_main, Criterion};
use domain_vitals::config::{validate_config, Config, ConfigLoader, EndpointSpec, GlobalConfig};
use domain_vitals::health::resolve_domain;
use std::hint::black_box;

const BENCH_CONFIG_TOML: &str = r#"
[global]
check_interval_seconds = 15
request_timeout_seconds = 5
latency_threshold_ms = 500
max_concurrent_checks = 32
log_level = "info"

[[endpoints]]
name = "index"
url = "https://example.com/"

[[endpoints]]
name = "search"
url = "https://search.example.org/q?term=rust"
method = "POST"
body = "q=rust"

[endpoints.headers]
content-type = "application/x-www-form-urlencoded"
"#;

/// 配置处理基准测试
fn config_processing_benchmark(c: &mut Criterion) {
    c.bench_function("config_deserialization", |b| {
        b.iter(|| {
            let config: Config = toml::from_str(black_box(BENCH_CONFIG_TOML)).unwrap();
            black_box(config)
        });
    });

    c.bench_function("config_load_from_str", |b| {
        let loader = ConfigLoader::new(false);

        b.iter(|| {
            let config = loader.load_from_str(black_box(BENCH_CONFIG_TOML)).unwrap();
            black_box(config)
        });
    });

    c.bench_function("config_validation", |b| {
        let config = create_test_config(100);

        b.iter(|| {
            let result = validate_config(black_box(&config));
            black_box(result)
        });
    });

    c.bench_function("resolve_domain", |b| {
        b.iter(|| {
            let domain = resolve_domain(black_box("https://api.example.com:8443/v1/health?x=1"));
            black_box(domain)
        });
    });
}

/// 创建测试配置
fn create_test_config(endpoints: usize) -> Config {
    Config {
        global: GlobalConfig::default(),
        endpoints: (0..endpoints)
            .map(|i| {
                EndpointSpec::new(
                    format!("endpoint-{}", i),
                    format!("https://host{}.example.com/health", i % 10),
                )
            })
            .collect(),
    }
}

criterion_group!(benches, config_processing_benchmark);
criterion_main!(benches);
