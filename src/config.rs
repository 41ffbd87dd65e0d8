use std::path::PathBuf;

use tracing::debug;

use crate::{environment::Environment, error::EnvironmentError};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub environment_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup("ENV_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("ENV_PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
            service_name: "client-environment".to_string(),
            environment_file: lookup("ENV_FILE")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Reads the record from `ENV_FILE` when set, otherwise from the
    /// `APP_*` variables, and validates it.
    pub fn load_environment(&self) -> Result<Environment, EnvironmentError> {
        let env = match &self.environment_file {
            Some(path) => Environment::from_json_file(path)?,
            None => {
                debug!("environment loaded from process variables");
                Environment::from_env()?
            }
        };
        env.validate()?;
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::AppConfig;
    use crate::error::EnvironmentError;

    fn with_file(path: Option<std::path::PathBuf>) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            service_name: "client-environment".to_string(),
            environment_file: path,
        }
    }

    #[test]
    fn loads_and_validates_record_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"production":true,"apiServerUrl":"https://api.coffee.test",
                "auth0":{{"url":"coffee","audience":"drinks","clientId":"abc",
                "callbackURL":"https://coffee.test"}}}}"#
        )
        .expect("write record");

        let err = with_file(Some(file.path().to_path_buf()))
            .load_environment()
            .expect_err("audience is not a url");
        assert!(matches!(
            err,
            EnvironmentError::InvalidUrl {
                field: "auth0.audience",
                ..
            }
        ));
    }

    #[test]
    fn file_takes_precedence_over_variables() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"production":true,"apiServerUrl":"https://api.coffee.test",
                "auth0":{{"url":"coffee","audience":"https://api.coffee.test",
                "clientId":"abc","callbackURL":"https://coffee.test"}}}}"#
        )
        .expect("write record");

        let env = with_file(Some(file.path().to_path_buf()))
            .load_environment()
            .expect("valid record");
        assert!(env.production);
        assert_eq!(env.auth0.domain(), "coffee.auth0.com");
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.service_name, "client-environment");
        assert!(config.environment_file.is_none());
    }

    #[test]
    fn reads_listen_address_and_file() {
        let config = AppConfig::from_lookup(|key: &str| match key {
            "ENV_HOST" => Some("127.0.0.1".to_string()),
            "ENV_PORT" => Some("9090".to_string()),
            "ENV_FILE" => Some("/etc/coffee/env.json".to_string()),
            _ => None,
        });
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(
            config.environment_file,
            Some(std::path::PathBuf::from("/etc/coffee/env.json"))
        );
    }

    #[test]
    fn unparseable_port_falls_back() {
        let config = AppConfig::from_lookup(|key: &str| match key {
            "ENV_PORT" => Some("eighty".to_string()),
            "ENV_FILE" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert!(config.environment_file.is_none());
    }

    #[test]
    fn malformed_record_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"production": "nope""#).expect("write record");

        let err = with_file(Some(file.path().to_path_buf()))
            .load_environment()
            .expect_err("record is malformed");
        assert!(matches!(err, EnvironmentError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = with_file(Some(dir.path().join("absent.json")))
            .load_environment()
            .expect_err("file is absent");
        assert!(matches!(err, EnvironmentError::Read { .. }));
    }
}
