// Layered loading tests. `figment::Jail` isolates the working directory and
// environment per test.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;

use roborock_config::{ConfigError, load_config_from, load_vacuum_config};

const TOKEN: &str = "476e6b70343055483230644c53707a12";

#[test]
fn test_file_values_are_loaded() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            &format!(
                r#"
                name = "Downstairs"
                ip = "192.168.1.50"
                token = "{TOKEN}"
                pause = true
                poll_interval_secs = 60
                "#
            ),
        )?;

        let cfg = load_vacuum_config(Some(Path::new("config.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(cfg.name, "Downstairs");
        assert_eq!(cfg.address, "192.168.1.50");
        assert!(cfg.pause);
        assert!(!cfg.dock);
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.call_timeout, Duration::from_secs(10));
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            &format!("ip = \"192.168.1.50\"\ntoken = \"{TOKEN}\"\ndock = false\n"),
        )?;
        jail.set_env("ROBOROCK_IP", "10.0.0.7");
        jail.set_env("ROBOROCK_DOCK", "true");
        jail.set_env("ROBOROCK_TIMEOUT_SECS", "3");

        let cfg = load_vacuum_config(Some(Path::new("config.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(cfg.address, "10.0.0.7");
        assert!(cfg.dock);
        assert_eq!(cfg.call_timeout, Duration::from_secs(3));
        Ok(())
    });
}

#[test]
fn test_missing_file_falls_back_to_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("ROBOROCK_IP", "192.168.1.50");
        jail.set_env("ROBOROCK_TOKEN", TOKEN);

        let cfg =
            load_vacuum_config(Some(Path::new("absent.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(cfg.name, "Roborock vacuum cleaner");
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        Ok(())
    });
}

#[test]
fn test_missing_token_is_fatal() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "ip = \"192.168.1.50\"\n")?;

        let result = load_vacuum_config(Some(Path::new("config.toml")));
        assert!(
            matches!(result, Err(ConfigError::Missing { field: "token", .. })),
            "got: {result:?}"
        );
        Ok(())
    });
}

#[test]
fn test_malformed_value_is_a_loading_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "poll_interval_secs = \"often\"\n")?;

        let result = load_config_from(Path::new("config.toml"));
        assert!(matches!(result, Err(ConfigError::Figment(_))), "got: {result:?}");
        Ok(())
    });
}
