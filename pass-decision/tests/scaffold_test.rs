// Scaffold checks: default config and fixtures are present and well formed.

use std::path::Path;

/// Verify that defaults/evaluation.toml is valid TOML.
#[test]
fn default_evaluation_toml_is_valid() {
    let content = std::fs::read_to_string("defaults/evaluation.toml")
        .expect("defaults/evaluation.toml should exist");
    let parsed: Result<toml::Value, _> = toml::from_str(&content);
    assert!(
        parsed.is_ok(),
        "defaults/evaluation.toml is not valid TOML: {:?}",
        parsed.err()
    );
}

/// Verify the default config carries the expected sections and values.
#[test]
fn default_evaluation_toml_has_expected_settings() {
    let content = std::fs::read_to_string("defaults/evaluation.toml").unwrap();
    let config: toml::Value = toml::from_str(&content).unwrap();

    let thresholds = config.get("thresholds").expect("thresholds section should exist");
    let good_completion = thresholds
        .get("good_completion")
        .unwrap()
        .as_float()
        .unwrap();
    assert!((good_completion - 0.80).abs() < f64::EPSILON);
    // Threat threshold is calibrated unless set explicitly.
    assert!(thresholds.get("good_threat").is_none());

    let paths = config.get("data_paths").expect("data_paths section should exist");
    assert!(paths.get("events").unwrap().as_str().is_some());
    assert!(paths.get("players").unwrap().as_str().is_some());

    let report = config.get("report").expect("report section should exist");
    assert_eq!(report.get("third").unwrap().as_str().unwrap(), "All");
    assert!(report.get("top").unwrap().as_integer().unwrap() > 0);
}

/// Verify that all expected directories exist.
#[test]
fn directory_structure_exists() {
    let expected_dirs = [
        "src",
        "src/data",
        "src/evaluation",
        "defaults",
        "tests",
        "tests/fixtures",
    ];
    for dir in expected_dirs {
        assert!(Path::new(dir).is_dir(), "Expected directory '{}' to exist", dir);
    }
}

/// Verify that all expected source files exist.
#[test]
fn source_files_exist() {
    let expected_files = [
        "src/main.rs",
        "src/lib.rs",
        "src/config.rs",
        "src/report.rs",
        "src/data/mod.rs",
        "src/data/possessions.rs",
        "src/data/minutes.rs",
        "src/evaluation/mod.rs",
        "src/evaluation/threshold.rs",
        "src/evaluation/comparator.rs",
        "src/evaluation/pipeline.rs",
        "src/evaluation/players.rs",
        "src/evaluation/league.rs",
        "src/evaluation/filters.rs",
    ];
    for file in expected_files {
        assert!(Path::new(file).is_file(), "Expected source file '{}' to exist", file);
    }
}

/// Verify that fixture CSV files have the columns the loaders read.
#[test]
fn fixture_csv_files_have_headers() {
    let events = std::fs::read_to_string("tests/fixtures/dynamic_events.csv")
        .expect("dynamic_events.csv should exist");
    let header = events.lines().next().unwrap();
    for column in [
        "event_id",
        "match_id",
        "event_type",
        "player_id",
        "player_targeted_xthreat",
        "player_targeted_xpass_completion",
        "n_passing_options",
        "associated_player_possession_event_id",
        "xthreat",
        "xpass_completion",
    ] {
        assert!(
            header.split(',').any(|c| c == column),
            "dynamic_events.csv is missing column {column}"
        );
    }

    let players =
        std::fs::read_to_string("tests/fixtures/players.csv").expect("players.csv should exist");
    let header = players.lines().next().unwrap();
    assert!(header.contains("id,short_name"));
    assert!(header.contains("playing_time.total.minutes_played"));
}
