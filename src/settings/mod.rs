// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Context as _;
use serde::Deserialize;

use std::fs;
use std::path::Path;

mod cli;

use crate::camera::CameraSettings;
use crate::inference::ModelSettings;
use crate::render::RenderSettings;
use crate::trigger::TriggerSettings;
use crate::upload::UploadSettings;
pub(crate) use cli::Args;

#[derive(Debug, Deserialize)]
pub(crate) struct Settings {
    /// Thermal camera settings.
    #[serde(default)]
    pub(crate) sensor: CameraSettings,

    /// The GPIO lines that trigger a capture.
    #[serde(default)]
    pub(crate) trigger: TriggerSettings,

    /// How temperatures are turned into an image, and where that image is kept.
    #[serde(default)]
    pub(crate) image: RenderSettings,

    /// The fire classifier.
    #[serde(default)]
    pub(crate) model: ModelSettings,

    /// Where and how images are uploaded.
    pub(crate) upload: UploadSettings,
}

impl Settings {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let config_data = fs::read_to_string(path)
            .with_context(|| format!("Unable to read configuration file {}", path.display()))?;
        toml::from_str(&config_data)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::path::Path;

    use tempfile::NamedTempFile;

    use crate::camera::CameraSettings;
    use crate::inference::ModelSettings;

    use super::Settings;

    #[test]
    fn minimal() {
        let source = r#"
        [upload]
        url = "https://example.com/fmon/post-file.php"
        api_key = "Fm#25"
        "#;
        let parsed: Settings = toml::from_str(source).expect("a minimal config to parse");
        assert_eq!(parsed.sensor, CameraSettings::default());
        assert_eq!(parsed.model, ModelSettings::default());
        assert_eq!(parsed.trigger.pins, [32, 26]);
        assert_eq!(parsed.image.range.min(), 20);
        assert_eq!(parsed.image.range.max(), 300);
    }

    #[test]
    fn example_config() {
        let source = include_str!("../../config_example.toml");
        let parsed: Result<Settings, _> = toml::from_str(source);
        assert!(parsed.is_ok(), "Unable to parse example config: {:?}", parsed);
    }

    #[test]
    fn error_missing_upload() {
        let parsed: Result<Settings, _> = toml::from_str("[trigger]\npins = [1, 2]");
        assert!(parsed.is_err());
    }

    #[test]
    fn error_inverted_range() {
        let source = r#"
        [image]
        min_temperature = 300
        max_temperature = 20

        [upload]
        url = "https://example.com/fmon/post-file.php"
        api_key = "Fm#25"
        "#;
        let parsed: Result<Settings, _> = toml::from_str(source);
        assert!(parsed.is_err());
    }

    #[test]
    fn load_file() {
        let mut file = NamedTempFile::new().expect("to be able to create a temp file");
        write!(
            file,
            r#"
            [sensor]
            kind = "mock"
            path = "frames.toml"

            [model]
            kind = "mock"
            logits = [[0, 5]]

            [upload]
            url = "http://localhost:8000/post"
            api_key = "key"
            "#
        )
        .expect("to be able to write to a new temp file");
        let settings = Settings::load(file.path()).expect("the config file to load");
        assert!(matches!(settings.sensor, CameraSettings::MockCamera { .. }));
        assert!(matches!(settings.model, ModelSettings::Mock { .. }));
    }

    #[test]
    fn load_missing_file() {
        assert!(Settings::load(Path::new("/nonexistent/config.toml")).is_err());
    }
}
