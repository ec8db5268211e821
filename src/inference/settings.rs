// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::PathBuf;

use serde::Deserialize;

use super::engine::{InferenceEngine, MockEngine};
use super::quantization::{default_zero_point, Quantization, Scale};

/// NHWC shape of a single 24 row by 32 column grayscale image.
const DEFAULT_INPUT_SHAPE: [usize; 4] = [1, 24, 32, 1];

fn default_input_shape() -> [usize; 4] {
    DEFAULT_INPUT_SHAPE
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.onnx")
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub(crate) enum ModelSettings {
    Onnx {
        #[serde(default = "default_model_path")]
        path: PathBuf,

        #[serde(default = "default_input_shape")]
        input_shape: [usize; 4],

        #[serde(default)]
        scale: Scale,

        #[serde(default = "default_zero_point")]
        zero_point: i32,
    },
    Mock {
        logits: Vec<[i8; 2]>,

        #[serde(default = "default_input_shape")]
        input_shape: [usize; 4],

        #[serde(default)]
        scale: Scale,

        #[serde(default = "default_zero_point")]
        zero_point: i32,
    },
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::Onnx {
            path: default_model_path(),
            input_shape: DEFAULT_INPUT_SHAPE,
            scale: Scale::default(),
            zero_point: default_zero_point(),
        }
    }
}

impl ModelSettings {
    pub(crate) fn quantization(&self) -> Quantization {
        match self {
            Self::Onnx {
                scale, zero_point, ..
            } => Quantization::new(*scale, *zero_point),
            Self::Mock {
                scale, zero_point, ..
            } => Quantization::new(*scale, *zero_point),
        }
    }

    /// Load the model.
    pub(crate) fn create_engine(&self) -> anyhow::Result<Box<dyn InferenceEngine>> {
        let quantization = self.quantization();
        Ok(match self {
            #[cfg(feature = "onnx")]
            Self::Onnx {
                path, input_shape, ..
            } => Box::new(super::onnx::OnnxEngine::load(
                path,
                *input_shape,
                quantization,
            )?),
            #[cfg(not(feature = "onnx"))]
            Self::Onnx { .. } => {
                anyhow::bail!("fire-watch was built without ONNX Runtime support")
            }
            Self::Mock {
                logits,
                input_shape,
                ..
            } => Box::new(MockEngine::new(
                logits.clone(),
                quantization,
                input_shape.iter().product(),
            )?),
        })
    }
}

#[cfg(test)]
mod test {
    use std::convert::TryFrom;
    use std::path::PathBuf;

    use super::super::quantization::{Quantization, Scale};
    use super::ModelSettings;

    #[test]
    fn defaults() {
        let parsed: ModelSettings =
            toml::from_str("kind = \"onnx\"").expect("a minimal model config to parse");
        assert_eq!(parsed, ModelSettings::default());
        assert_eq!(parsed.quantization(), Quantization::default());
    }

    #[test]
    fn onnx_full() {
        let source = r#"
        kind = "onnx"
        path = "/opt/fire/model.onnx"
        input_shape = [1, 1, 24, 32]
        scale = 0.5
        zero_point = 3
        "#;
        let parsed: ModelSettings = toml::from_str(source).expect("the model config to parse");
        let expected = ModelSettings::Onnx {
            path: PathBuf::from("/opt/fire/model.onnx"),
            input_shape: [1, 1, 24, 32],
            scale: Scale::try_from(0.5).unwrap(),
            zero_point: 3,
        };
        assert_eq!(parsed, expected);
    }

    #[test]
    fn error_zero_scale() {
        let source = r#"
        kind = "onnx"
        scale = 0.0
        "#;
        let parsed: Result<ModelSettings, _> = toml::from_str(source);
        assert!(parsed.is_err(), "Accepted a zero scale:\n{}", source);
    }

    #[test]
    fn error_logit_range() {
        let source = r#"
        kind = "mock"
        logits = [[0, 500]]
        "#;
        let parsed: Result<ModelSettings, _> = toml::from_str(source);
        assert!(parsed.is_err(), "Accepted an out of range logit:\n{}", source);
    }

    #[test]
    fn mock_engine() {
        let source = r#"
        kind = "mock"
        logits = [[0, 5], [7, -2]]
        "#;
        let parsed: ModelSettings = toml::from_str(source).expect("the model config to parse");
        let mut engine = parsed.create_engine().expect("a mock engine to be created");
        let input = vec![0i8; 24 * 32];
        assert_eq!(engine.invoke(&input).unwrap(), [0, 5]);
        assert_eq!(engine.invoke(&input).unwrap(), [7, -2]);
    }

    #[test]
    fn missing_model() {
        let settings = ModelSettings::Onnx {
            path: PathBuf::from("/nonexistent/model.onnx"),
            input_shape: [1, 24, 32, 1],
            scale: Scale::default(),
            zero_point: -128,
        };
        assert!(settings.create_engine().is_err());
    }
}
