mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(config_str)?;

    if let Ok(root) = env::var("WORKING_DIR") {
        config.workspace.root = root.into();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_parse_applies_defaults() {
        let config = parse("server:\n  port: 8080\n").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.logs.level, "info");
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.model.samples_path(), PathBuf::from("/contrib_src/sample_data"));
    }

    #[test]
    fn test_absolute_model_paths_are_kept() {
        let config = parse(
            r#"
model:
  contrib_src: "/srv/contrib"
  model_dir: "/opt/model"
  legal_file: "license/legal.json"
"#,
        )
        .unwrap();

        assert_eq!(config.model.model_path(), PathBuf::from("/opt/model"));
        assert_eq!(
            config.model.legal_path(),
            PathBuf::from("/srv/contrib/license/legal.json")
        );
    }

    #[test]
    fn test_parse_rejects_invalid_yaml() {
        let result = parse("server:\n  port: \"not-a-number\"\n");
        assert!(result.is_err());
    }
}
