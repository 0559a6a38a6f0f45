//! Tests for validated configuration.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::{NamedTempFile, tempdir};

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::{ValidatedConfig, write_default_config};

/// Helper to create CLI args from a slice, running `dump` unless a
/// subcommand is given
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["optstore"];
    full_args.extend(args);
    if !args.iter().any(|a| matches!(*a, "get" | "set" | "delete" | "dump" | "watch")) {
        full_args.push("dump");
    }
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

mod required_fields {
    use super::*;

    #[test]
    fn missing_directory_returns_error() {
        let result = ValidatedConfig::from_raw(&cli(&[]), None);

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequired {
                field: "directory",
                ..
            })
        ));
    }

    #[test]
    fn directory_from_cli() {
        let config = ValidatedConfig::from_raw(&cli(&["-d", "/srv/app"]), None).unwrap();
        assert_eq!(config.directory, PathBuf::from("/srv/app"));
    }

    #[test]
    fn directory_from_toml() {
        let toml = toml(
            r#"
            [store]
            directory = "/var/lib/app"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();
        assert_eq!(config.directory, PathBuf::from("/var/lib/app"));
    }
}

mod precedence {
    use super::*;

    fn full_toml() -> TomlConfig {
        toml(
            r#"
            [store]
            directory = "/from/toml"
            filename = "toml.json"
            debounce_ms = 500
        "#,
        )
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = ValidatedConfig::from_raw(&cli(&["-d", "/srv/app"]), None).unwrap();

        assert_eq!(config.filename, "options.json");
        assert_eq!(config.debounce, Duration::ZERO);
        assert!(config.watch);
        assert!(!config.verbose);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&full_toml())).unwrap();

        assert_eq!(config.filename, "toml.json");
        assert_eq!(config.debounce, Duration::from_millis(500));
    }

    #[test]
    fn cli_overrides_toml() {
        let cli = cli(&[
            "-d",
            "/from/cli",
            "--file",
            "cli.json",
            "--debounce-ms",
            "20",
        ]);

        let config = ValidatedConfig::from_raw(&cli, Some(&full_toml())).unwrap();

        assert_eq!(config.directory, PathBuf::from("/from/cli"));
        assert_eq!(config.filename, "cli.json");
        assert_eq!(config.debounce, Duration::from_millis(20));
    }

    #[test]
    fn no_watch_flag_disables_watching() {
        let config =
            ValidatedConfig::from_raw(&cli(&["-d", "/srv/app", "--no-watch"]), None).unwrap();
        assert!(!config.watch);
    }

    #[test]
    fn toml_can_disable_watching() {
        let toml = toml(
            r#"
            [store]
            directory = "/srv/app"
            watch = false
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();
        assert!(!config.watch);
    }

    #[test]
    fn verbose_flag() {
        let config = ValidatedConfig::from_raw(&cli(&["-d", "/srv/app", "-v"]), None).unwrap();
        assert!(config.verbose);
    }
}

mod validation {
    use super::*;

    #[test]
    fn empty_filename_returns_error() {
        let result = ValidatedConfig::from_raw(&cli(&["-d", "/srv", "--file", ""]), None);
        assert!(matches!(result, Err(ConfigError::InvalidFilename { .. })));
    }

    #[test]
    fn filename_with_separator_returns_error() {
        let result = ValidatedConfig::from_raw(&cli(&["-d", "/srv", "--file", "a/b.json"]), None);
        assert!(matches!(result, Err(ConfigError::InvalidFilename { .. })));
    }

    #[test]
    fn parent_directory_filename_returns_error() {
        let result = ValidatedConfig::from_raw(&cli(&["-d", "/srv", "--file", ".."]), None);
        assert!(matches!(result, Err(ConfigError::InvalidFilename { .. })));
    }

    #[test]
    fn oversized_debounce_returns_error() {
        let result = ValidatedConfig::from_raw(
            &cli(&["-d", "/srv", "--debounce-ms", "3600001"]),
            None,
        );

        assert!(matches!(
            result,
            Err(ConfigError::InvalidDuration {
                field: "debounce_ms",
                ..
            })
        ));
    }

    #[test]
    fn maximum_debounce_is_accepted() {
        let config =
            ValidatedConfig::from_raw(&cli(&["-d", "/srv", "--debounce-ms", "3600000"]), None)
                .unwrap();
        assert_eq!(config.debounce, Duration::from_secs(3600));
    }

    #[test]
    fn watch_command_with_watching_disabled_returns_error() {
        let result = ValidatedConfig::from_raw(&cli(&["-d", "/srv", "--no-watch", "watch"]), None);
        assert!(matches!(result, Err(ConfigError::WatchDisabled)));
    }
}

mod store_options {
    use super::*;

    #[test]
    fn carries_every_setting() {
        let cli = cli(&[
            "-d",
            "/srv/app",
            "--file",
            "app.json",
            "--debounce-ms",
            "75",
            "--no-watch",
        ]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        let options = config.store_options();

        assert_eq!(options.path(), PathBuf::from("/srv/app/app.json"));
        assert_eq!(options.debounce(), Duration::from_millis(75));
        assert!(!options.watch());
    }

    #[test]
    fn display_shows_full_path() {
        let config = ValidatedConfig::from_raw(&cli(&["-d", "/srv/app"]), None).unwrap();
        let display = config.to_string();

        assert!(display.contains("options.json"));
        assert!(display.contains("debounce: 0ms"));
    }
}

mod config_load {
    use super::*;

    #[test]
    fn load_from_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [store]
            directory = "/var/lib/app"
            debounce_ms = 10
        "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = ValidatedConfig::load(&cli(&["--config", path])).unwrap();

        assert_eq!(config.directory, PathBuf::from("/var/lib/app"));
        assert_eq!(config.debounce, Duration::from_millis(10));
    }

    #[test]
    fn load_without_config_file() {
        let config = ValidatedConfig::load(&cli(&["-d", "/srv/app"])).unwrap();
        assert_eq!(config.directory, PathBuf::from("/srv/app"));
    }

    #[test]
    fn load_nonexistent_config_file_returns_error() {
        let result = ValidatedConfig::load(&cli(&["--config", "/nonexistent/optstore.toml"]));
        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn written_template_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("optstore.toml");

        write_default_config(&path).unwrap();
        let path_str = path.to_str().unwrap();
        let result = ValidatedConfig::load(&cli(&["--config", path_str, "-d", "/srv/app"]));

        assert!(result.is_ok());
    }

    #[test]
    fn write_to_missing_directory_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("optstore.toml");

        let result = write_default_config(&path);
        assert!(matches!(result, Err(ConfigError::FileWrite { .. })));
    }
}
