//! Tests for CLI argument parsing.

use std::path::PathBuf;

use clap::Parser;

use super::cli::{Cli, Command};

mod parsing {
    use super::*;

    #[test]
    fn parse_get_command() {
        let cli = Cli::parse_from_iter(["optstore", "--directory", "/tmp/app", "get", "theme"]);

        assert_eq!(cli.directory, Some(PathBuf::from("/tmp/app")));
        assert_eq!(
            cli.command,
            Command::Get {
                key: "theme".to_string()
            }
        );
    }

    #[test]
    fn parse_set_command() {
        let cli = Cli::parse_from_iter(["optstore", "set", "size", "12"]);

        assert_eq!(
            cli.command,
            Command::Set {
                key: "size".to_string(),
                value: "12".to_string(),
            }
        );
    }

    #[test]
    fn parse_set_with_json_value() {
        let cli = Cli::parse_from_iter(["optstore", "set", "list", r#"[1, "two"]"#]);

        let Command::Set { value, .. } = cli.command else {
            panic!("expected set command");
        };
        assert_eq!(value, r#"[1, "two"]"#);
    }

    #[test]
    fn parse_delete_dump_and_watch() {
        let delete = Cli::parse_from_iter(["optstore", "delete", "theme"]);
        assert_eq!(
            delete.command,
            Command::Delete {
                key: "theme".to_string()
            }
        );

        let dump = Cli::parse_from_iter(["optstore", "dump"]);
        assert_eq!(dump.command, Command::Dump);

        let watch = Cli::parse_from_iter(["optstore", "watch"]);
        assert_eq!(watch.command, Command::Watch);
    }

    #[test]
    fn parse_store_options() {
        let cli = Cli::parse_from_iter([
            "optstore",
            "-d",
            "/srv/app",
            "--file",
            "settings.json",
            "--debounce-ms",
            "250",
            "--no-watch",
            "dump",
        ]);

        assert_eq!(cli.directory, Some(PathBuf::from("/srv/app")));
        assert_eq!(cli.filename.as_deref(), Some("settings.json"));
        assert_eq!(cli.debounce_ms, Some(250));
        assert!(cli.no_watch);
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = Cli::parse_from_iter(["optstore", "dump", "--directory", "/srv/app", "-v"]);

        assert_eq!(cli.directory, Some(PathBuf::from("/srv/app")));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from_iter(["optstore", "-c", "/etc/optstore.toml", "dump"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/optstore.toml")));
    }

    #[test]
    fn defaults_are_unset() {
        let cli = Cli::parse_from_iter(["optstore", "dump"]);

        assert!(cli.directory.is_none());
        assert!(cli.filename.is_none());
        assert!(cli.debounce_ms.is_none());
        assert!(!cli.no_watch);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }
}

mod init_config {
    use super::*;

    #[test]
    fn default_output_path() {
        let cli = Cli::parse_from_iter(["optstore", "init-config"]);

        assert!(cli.is_init());
        assert_eq!(
            cli.command,
            Command::InitConfig {
                output: PathBuf::from("optstore.toml")
            }
        );
    }

    #[test]
    fn custom_output_path() {
        let cli = Cli::parse_from_iter(["optstore", "init-config", "-o", "custom.toml"]);

        assert_eq!(
            cli.command,
            Command::InitConfig {
                output: PathBuf::from("custom.toml")
            }
        );
    }

    #[test]
    fn other_commands_are_not_init() {
        let cli = Cli::parse_from_iter(["optstore", "dump"]);
        assert!(!cli.is_init());
    }
}

mod errors {
    use super::*;

    #[test]
    fn missing_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["optstore"]);
        assert!(result.is_err());
    }

    #[test]
    fn set_requires_value() {
        let result = Cli::try_parse_from(["optstore", "set", "key"]);
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_debounce_is_rejected() {
        let result = Cli::try_parse_from(["optstore", "--debounce-ms", "soon", "dump"]);
        assert!(result.is_err());
    }
}
