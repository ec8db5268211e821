// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::{anyhow, ensure};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::{info, trace};

use super::engine::InferenceEngine;
use super::quantization::Quantization;

/// A quantized classifier run by ONNX Runtime.
///
/// The model takes a single int8 tensor and produces an int8 tensor whose first two values are
/// the "no fire" and "fire" logits.
pub(crate) struct OnnxEngine {
    session: Session,
    input_shape: [usize; 4],
    quantization: Quantization,
}

impl OnnxEngine {
    pub(crate) fn load(
        path: &Path,
        input_shape: [usize; 4],
        quantization: Quantization,
    ) -> anyhow::Result<Self> {
        ensure!(path.exists(), "model file {} not found", path.display());
        let session = Session::builder()
            .map_err(|err| anyhow!("Unable to create an ONNX Runtime session: {}", err))?
            .commit_from_file(path)
            .map_err(|err| anyhow!("Unable to load model {}: {}", path.display(), err))?;
        info!(
            path = %path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "Loaded classifier model"
        );
        Ok(Self {
            session,
            input_shape,
            quantization,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn input_quantization(&self) -> Quantization {
        self.quantization
    }

    fn invoke(&mut self, input: &[i8]) -> anyhow::Result<[i8; 2]> {
        let expected_len: usize = self.input_shape.iter().product();
        ensure!(
            input.len() == expected_len,
            "model expects {} input values, given {}",
            expected_len,
            input.len()
        );
        let tensor = TensorRef::from_array_view((self.input_shape, input))
            .map_err(|err| anyhow!("Unable to create input tensor: {}", err))?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|err| anyhow!("Model invocation failed: {}", err))?;
        let (_, logits) = outputs[0]
            .try_extract_tensor::<i8>()
            .map_err(|err| anyhow!("Unexpected model output: {}", err))?;
        match logits {
            [no_fire, fire, ..] => {
                trace!(no_fire, fire, "Model output");
                Ok([*no_fire, *fire])
            }
            _ => Err(anyhow!(
                "model produced {} outputs, expected at least 2",
                logits.len()
            )),
        }
    }
}
