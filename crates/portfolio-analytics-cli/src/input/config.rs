use portfolio_analytics_core::AnalyticsConfig;
use tracing::debug;

use super::file;

/// Engine configuration from an optional YAML file, with CLI overrides on top.
pub fn load_config(
    path: Option<&str>,
    risk_free_rate: Option<f64>,
    seed: Option<u64>,
) -> Result<AnalyticsConfig, Box<dyn std::error::Error>> {
    let mut config: AnalyticsConfig = match path {
        Some(p) => file::read_yaml(p)?,
        None => AnalyticsConfig::default(),
    };
    if let Some(rf) = risk_free_rate {
        config.risk_free_rate = rf;
    }
    if let Some(s) = seed {
        config.seed = Some(s);
    }
    config.validate()?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_with_overrides() {
        let config = load_config(None, Some(0.03), Some(42)).unwrap();
        assert_eq!(config.risk_free_rate, 0.03);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_cli_flags_override_file() {
        let file = yaml("risk_free_rate: 0.01\nseed: 7\nsolver:\n  max_iterations: 200\n");
        let path = file.path().to_string_lossy().into_owned();

        let from_file = load_config(Some(&path), None, None).unwrap();
        assert_eq!(from_file.risk_free_rate, 0.01);
        assert_eq!(from_file.seed, Some(7));
        assert_eq!(from_file.solver.max_iterations, 200);

        let overridden = load_config(Some(&path), Some(0.04), Some(9)).unwrap();
        assert_eq!(overridden.risk_free_rate, 0.04);
        assert_eq!(overridden.seed, Some(9));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let file = yaml("solver:\n  tolerance: 0.0\n");
        let path = file.path().to_string_lossy().into_owned();
        assert!(load_config(Some(&path), None, None).is_err());
        assert!(load_config(Some("/nonexistent/pa.yaml"), None, None).is_err());
    }
}
