//! Optional config file loading. Search order: ./tululu-crawl.toml, then
//! $XDG_CONFIG_HOME/tululu-crawl/config.toml (or ~/.config/tululu-crawl/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override
/// defaults, and CLI flags override the file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Root folder for downloaded artifacts (`books/`, `images/`).
    pub dest_folder: Option<PathBuf>,
    /// Path of the JSON collection file.
    pub json_path: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Sleep in seconds before retrying after a connection failure.
    pub backoff_secs: Option<u64>,
}

/// Missing file returns Ok(None). Invalid TOML or an I/O error reading a
/// present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("tululu-crawl.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("tululu-crawl").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.dest_folder.is_none());
        assert!(c.json_path.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.request_delay_secs.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.backoff_secs.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            dest_folder = "media"
            json_path = "media/books_description.json"
            user_agent = "Custom/1.0"
            request_delay_secs = 2
            timeout_secs = 60
            backoff_secs = 300
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.dest_folder.as_deref(), Some(std::path::Path::new("media")));
        assert_eq!(
            c.json_path.as_deref(),
            Some(std::path::Path::new("media/books_description.json"))
        );
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.request_delay_secs, Some(2));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.backoff_secs, Some(300));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("backoff_secs = 60").unwrap();
        assert!(c.dest_folder.is_none());
        assert_eq!(c.backoff_secs, Some(60));
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("dest_folder = [").is_err());
    }
}
