// SPDX-License-Identifier: GPL-3.0-or-later
mod engine;
#[cfg(feature = "onnx")]
mod onnx;
mod quantization;
mod settings;

pub(crate) use engine::InferenceEngine;
pub(crate) use quantization::Classification;
#[cfg(test)]
pub(crate) use quantization::Quantization;
pub(crate) use settings::ModelSettings;

use crate::image_buffer::GrayImage;

/// Runs an [`InferenceEngine`] over grayscale images.
///
/// The quantized input buffer is allocated once and reused for every image.
pub(crate) struct Classifier {
    engine: Box<dyn InferenceEngine>,
    input: Vec<i8>,
}

impl Classifier {
    pub(crate) fn new(engine: Box<dyn InferenceEngine>) -> Self {
        Self {
            engine,
            input: Vec::new(),
        }
    }

    pub(crate) fn classify(&mut self, image: &GrayImage) -> anyhow::Result<Classification> {
        let quantization = self.engine.input_quantization();
        quantization.quantize_image(image, &mut self.input);
        let [no_fire, fire] = self.engine.invoke(&self.input)?;
        Ok(Classification::from_logits(no_fire, fire))
    }
}

#[cfg(test)]
mod test {
    use image::{GrayImage, Luma};

    use super::engine::MockEngine;
    use super::{Classifier, Quantization};

    #[test]
    fn classify_mock() {
        let engine = MockEngine::new(vec![[-5, 20], [3, 3]], Quantization::default(), 6).unwrap();
        let mut classifier = Classifier::new(Box::new(engine));
        let image = GrayImage::from_pixel(3, 2, Luma([200]));
        let first = classifier.classify(&image).unwrap();
        assert!(first.fire);
        assert_eq!((first.no_fire_logit, first.fire_logit), (-5, 20));
        let second = classifier.classify(&image).unwrap();
        assert!(!second.fire);
    }

    #[test]
    fn wrong_image_size() {
        let engine = MockEngine::new(vec![[0, 1]], Quantization::default(), 6).unwrap();
        let mut classifier = Classifier::new(Box::new(engine));
        assert!(classifier.classify(&GrayImage::new(4, 4)).is_err());
    }
}
