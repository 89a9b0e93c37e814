use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_PORT: u16 = 3746;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub max_concurrency: usize,
    pub max_body_bytes: usize,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub tesseract_path: String,
    pub ocr_languages: String,
    pub page_segmentation_mode: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_body_bytes: 32 * 1024 * 1024,
            max_dimension: 1024,
            jpeg_quality: 95,
            tesseract_path: "tesseract".to_string(),
            ocr_languages: "eng".to_string(),
            page_segmentation_mode: 3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    image: Option<ImageSettings>,
    tesseract: Option<TesseractSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    host: Option<String>,
    port: Option<u16>,
    max_concurrency: Option<usize>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageSettings {
    max_dimension: Option<u32>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct TesseractSettings {
    path: Option<String>,
    languages: Option<String>,
    psm: Option<u32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings
        .merge_toml(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse bundled settings.toml")?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_toml(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}

impl Settings {
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(host) = server.host {
                if !host.trim().is_empty() {
                    self.host = host.trim().to_string();
                }
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if let Some(limit) = server.max_concurrency {
                if limit > 0 {
                    self.max_concurrency = limit;
                }
            }
            if let Some(limit) = server.max_body_bytes {
                if limit > 0 {
                    self.max_body_bytes = limit;
                }
            }
        }
        if let Some(image) = incoming.image {
            if let Some(max) = image.max_dimension {
                if max > 0 {
                    self.max_dimension = max;
                }
            }
            if let Some(quality) = image.jpeg_quality {
                if (1..=100).contains(&quality) {
                    self.jpeg_quality = quality;
                }
            }
        }
        if let Some(tesseract) = incoming.tesseract {
            if let Some(path) = tesseract.path {
                if !path.trim().is_empty() {
                    self.tesseract_path = path;
                }
            }
            if let Some(languages) = tesseract.languages {
                if !languages.trim().is_empty() {
                    self.ocr_languages = languages;
                }
            }
            if let Some(psm) = tesseract.psm {
                if psm <= 13 {
                    self.page_segmentation_mode = psm;
                }
            }
        }
    }

    /// Applies `OCR_SERVER_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OCR_SERVER_HOST") {
            if !host.trim().is_empty() {
                self.host = host.trim().to_string();
            }
        }
        if let Some(port) = lookup("OCR_SERVER_PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid OCR_SERVER_PORT: {}", port))?;
        }
        if let Some(limit) = lookup("OCR_SERVER_MAX_CONCURRENCY") {
            let limit: usize = limit
                .trim()
                .parse()
                .with_context(|| format!("invalid OCR_SERVER_MAX_CONCURRENCY: {}", limit))?;
            if limit == 0 {
                return Err(anyhow!("OCR_SERVER_MAX_CONCURRENCY must be at least 1"));
            }
            self.max_concurrency = limit;
        }
        Ok(())
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ocr-server"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_service_contract() {
        let settings = Settings::default();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 3746);
        assert_eq!(settings.max_concurrency, 4);
        assert_eq!(settings.max_dimension, 1024);
        assert_eq!(settings.jpeg_quality, 95);
    }

    #[test]
    fn bundled_settings_file_matches_built_in_defaults() {
        let mut settings = Settings::default();
        settings.merge_toml(DEFAULT_SETTINGS_TOML).expect("bundled settings");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let mut settings = Settings::default();
        settings
            .merge_toml("[server]\nport = 8080\nmax_concurrency = 2\n")
            .expect("first");
        settings
            .merge_toml("[server]\nmax_concurrency = 8\n[tesseract]\nlanguages = \"eng+jpn\"\n")
            .expect("second");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.ocr_languages, "eng+jpn");
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let mut settings = Settings::default();
        settings
            .merge_toml(
                "[server]\nmax_concurrency = 0\n[image]\nmax_dimension = 0\njpeg_quality = 0\n[tesseract]\npsm = 42\n",
            )
            .expect("parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut settings = Settings::default();
        assert!(settings.merge_toml("[server\nport = ").is_err());
        assert!(settings.merge_toml("[server]\nport = \"high\"\n").is_err());
    }

    #[test]
    fn environment_overrides_files() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("OCR_SERVER_HOST", " 127.0.0.1 "),
                ("OCR_SERVER_PORT", "9000"),
                ("OCR_SERVER_MAX_CONCURRENCY", "6"),
            ]))
            .expect("env");
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.max_concurrency, 6);
    }

    #[test]
    fn invalid_environment_values_fail() {
        let mut settings = Settings::default();
        assert!(settings.apply_env(env(&[("OCR_SERVER_PORT", "abc")])).is_err());
        assert!(
            settings
                .apply_env(env(&[("OCR_SERVER_MAX_CONCURRENCY", "0")]))
                .is_err()
        );
    }

    #[test]
    fn missing_extra_settings_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_settings(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
