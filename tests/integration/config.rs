use std::collections::HashMap;

use dynidx::EngineConfig;
use dynidx::test_utils::{TestCase, run_table_tests};

use crate::common::fixture_path;

type Summary = (usize, usize, f64, bool, u32, Option<usize>);

fn summarize(config: &EngineConfig) -> Summary {
    (
        config.search.default_page_size,
        config.search.max_page_size,
        config.search.fuzzy_threshold,
        config.cache.enabled,
        config.codec.level,
        config.index.default_max_items,
    )
}

#[test]
fn fixtures_load_with_defaults_filled_in() -> Result<(), String> {
    let cases = vec![
        TestCase::new(
            "default",
            "configs/default.toml",
            (20, 1000, 0.6, true, 6, None),
        ),
        TestCase::new(
            "tuned",
            "configs/tuned.toml",
            (10, 200, 0.75, false, 9, Some(5000)),
        ),
        TestCase::new(
            "partial with clamped level",
            "configs/partial.toml",
            (20, 1000, 0.5, true, 9, None),
        ),
    ];

    run_table_tests(cases, |relative| {
        let config = EngineConfig::from_file(&fixture_path(relative)).unwrap();
        summarize(&config)
    })
}

#[test]
fn tuned_fixture_sets_every_section() {
    let config = EngineConfig::load(Some(&fixture_path("configs/tuned.toml"))).unwrap();
    assert_eq!(config.search.slow_query_ms, 50);
    assert_eq!(config.search.parallel_threshold, 2000);
    assert_eq!(config.cache.capacity, 16);
}

#[test]
fn invalid_fixture_is_a_config_error() {
    let err = EngineConfig::from_file(&fixture_path("configs/invalid.toml")).unwrap_err();
    assert_eq!(err.code(), "config");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = EngineConfig::load(Some(&fixture_path("configs/nope.toml"))).unwrap_err();
    assert_eq!(err.code(), "config");
}

#[test]
fn environment_overrides_file_values() {
    let mut config = EngineConfig::from_file(&fixture_path("configs/tuned.toml")).unwrap();
    let env: HashMap<&str, &str> = HashMap::from([
        ("DYNIDX_SEARCH_DEFAULT_PAGE_SIZE", "25"),
        ("DYNIDX_CACHE_ENABLED", "true"),
        ("DYNIDX_CODEC_LEVEL", "1"),
    ]);
    config
        .apply_env_overrides(|key| env.get(key).map(ToString::to_string))
        .unwrap();
    assert_eq!(summarize(&config), (25, 200, 0.75, true, 1, Some(5000)));
}

#[test]
fn malformed_environment_value_is_rejected() {
    let mut config = EngineConfig::default();
    let err = config
        .apply_env_overrides(|key| (key == "DYNIDX_CACHE_CAPACITY").then(|| "lots".to_string()))
        .unwrap_err();
    assert_eq!(err.code(), "config");
}
