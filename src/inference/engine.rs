// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, ensure};
use tracing::trace;

use super::quantization::Quantization;

/// A quantized image classifier with a `[no fire, fire]` output.
pub(crate) trait InferenceEngine {
    /// The quantization parameters for the model's input tensor.
    fn input_quantization(&self) -> Quantization;

    /// Run the model over a quantized image, returning the `[no fire, fire]` logits.
    fn invoke(&mut self, input: &[i8]) -> anyhow::Result<[i8; 2]>;
}

/// An engine that replays a fixed list of logits, for running without a model.
#[derive(Clone, Debug)]
pub(crate) struct MockEngine {
    logits: Vec<[i8; 2]>,
    next: usize,
    quantization: Quantization,
    input_len: usize,
}

impl MockEngine {
    pub(crate) fn new(
        logits: Vec<[i8; 2]>,
        quantization: Quantization,
        input_len: usize,
    ) -> anyhow::Result<Self> {
        ensure!(!logits.is_empty(), "mock model needs at least one pair of logits");
        Ok(Self {
            logits,
            next: 0,
            quantization,
            input_len,
        })
    }
}

impl InferenceEngine for MockEngine {
    fn input_quantization(&self) -> Quantization {
        self.quantization
    }

    fn invoke(&mut self, input: &[i8]) -> anyhow::Result<[i8; 2]> {
        if input.len() != self.input_len {
            return Err(anyhow!(
                "model expects {} input values, given {}",
                self.input_len,
                input.len()
            ));
        }
        let logits = self.logits[self.next];
        self.next = (self.next + 1) % self.logits.len();
        trace!(?logits, "Replayed mock logits");
        Ok(logits)
    }
}
