// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::anyhow;
use http::StatusCode;
use tracing::{debug, info, info_span, warn};

use crate::camera::ThermalCamera;
use crate::error::{Stage, StageError};
use crate::image_buffer::{GrayImage, ThermalImage, FRAME_HEIGHT, FRAME_WIDTH};
use crate::inference::{Classification, Classifier};
use crate::render::{encode_bitmap, gray_grid, normalize, Bitmap, TemperatureRange};
use crate::settings::Settings;
use crate::storage::ImageStore;
use crate::temperature::Temperature;
use crate::upload::{send_body, upload_form, Boundary, HttpTransport, Transport};

/// The number of subframes read for every capture.
///
/// The MLX90640 reads out in a chess pattern by default, with each subframe only refreshing half
/// of the pixels, so two reads are needed for a complete image.
pub(crate) const SUBFRAMES_PER_CAPTURE: usize = 2;

/// How a single stage of a capture cycle went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Succeeded,
    Failed,
    /// Not attempted, because a stage it depends on failed.
    Skipped,
}

impl Default for Outcome {
    fn default() -> Self {
        Self::Skipped
    }
}

/// What happened during one capture cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CycleReport {
    pub(crate) sensor: Outcome,
    pub(crate) inference: Outcome,
    pub(crate) encoding: Outcome,
    pub(crate) storage: Outcome,
    pub(crate) transport: Outcome,
    /// The classification that was uploaded (or would have been).
    pub(crate) classification: Classification,
}

impl CycleReport {
    /// `true` when every stage of the cycle succeeded.
    pub(crate) fn is_complete(&self) -> bool {
        [
            self.sensor,
            self.inference,
            self.encoding,
            self.storage,
            self.transport,
        ]
        .iter()
        .all(|outcome| *outcome == Outcome::Succeeded)
    }
}

/// State that carries over from one cycle to the next.
#[derive(Debug)]
pub(crate) struct PipelineContext {
    /// The sensor writes each subframe into this buffer.
    frame: ThermalImage,

    /// The last successful classification, used when inference fails.
    classification: Classification,

    cycles: u64,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            frame: ThermalImage::new(FRAME_WIDTH, FRAME_HEIGHT),
            classification: Classification::default(),
            cycles: 0,
        }
    }
}

/// The collaborators a pipeline uses. Any of them may be missing if they failed to start.
#[derive(Default)]
pub(crate) struct Subsystems {
    pub(crate) camera: Option<Box<dyn ThermalCamera>>,
    pub(crate) classifier: Option<Classifier>,
    pub(crate) store: Option<ImageStore>,
    pub(crate) transport: Option<Box<dyn Transport>>,
}

/// Log a startup failure, leaving that subsystem disabled.
fn enable<T>(stage: Stage, name: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => {
            debug!("Started {}", name);
            Some(value)
        }
        Err(err) => {
            StageError::new(stage, err).log();
            warn!("Continuing with the {} disabled", name);
            None
        }
    }
}

impl Subsystems {
    /// Start everything the settings describe.
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            camera: enable(
                Stage::Calibration,
                "thermal camera",
                settings.sensor.create_camera(),
            ),
            classifier: enable(
                Stage::Inference,
                "classifier",
                settings.model.create_engine().map(Classifier::new),
            ),
            store: enable(
                Stage::Storage,
                "image store",
                ImageStore::new(&settings.image.path),
            ),
            transport: enable(
                Stage::Transport,
                "uploader",
                HttpTransport::new(&settings.upload)
                    .map(|transport| Box::new(transport) as Box<dyn Transport>),
            ),
        }
    }
}

/// Runs capture cycles, from reading the camera to uploading the result.
pub(crate) struct Pipeline {
    subsystems: Subsystems,
    range: TemperatureRange,
    api_key: String,
    boundary: Boundary,
    context: PipelineContext,
}

impl Pipeline {
    pub(crate) fn new(
        subsystems: Subsystems,
        range: TemperatureRange,
        api_key: String,
        boundary: Boundary,
    ) -> Self {
        Self {
            subsystems,
            range,
            api_key,
            boundary,
            context: PipelineContext::default(),
        }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Subsystems::from_settings(settings),
            settings.image.range,
            settings.upload.api_key.as_str().to_string(),
            settings.upload.boundary.clone(),
        )
    }

    /// Run a single capture cycle.
    ///
    /// Failures are logged and recorded in the returned report, they never end the cycle early
    /// unless later stages depend on the result.
    pub(crate) fn run_cycle(&mut self) -> CycleReport {
        self.context.cycles += 1;
        let span = info_span!("capture_cycle", cycle = self.context.cycles);
        let _enter = span.enter();
        let mut report = CycleReport::default();

        let ambient = match self.capture() {
            Ok(ambient) => {
                report.sensor = Outcome::Succeeded;
                ambient
            }
            Err(err) => {
                err.log();
                report.sensor = Outcome::Failed;
                report.classification = self.context.classification;
                return report;
            }
        };

        let gray = normalize(&self.context.frame, self.range);

        match self.classify(&gray) {
            Ok(classification) => {
                self.context.classification = classification;
                report.inference = Outcome::Succeeded;
            }
            Err(err) => {
                err.log();
                warn!(
                    "Using the previous classification ({})",
                    self.context.classification
                );
                report.inference = Outcome::Failed;
            }
        }
        report.classification = self.context.classification;

        self.deliver(&gray, &mut report);
        self.log_summary(ambient, &gray);
        report
    }

    fn capture(&mut self) -> Result<Temperature, StageError> {
        let camera = self.subsystems.camera.as_mut().ok_or_else(|| {
            StageError::new(Stage::Sensor, anyhow!("the camera is not available"))
        })?;
        let frame = &mut self.context.frame;
        let mut ambient = camera
            .read_subframe(frame)
            .map_err(|err| StageError::new(Stage::Sensor, err))?;
        for _ in 1..SUBFRAMES_PER_CAPTURE {
            ambient = camera
                .read_subframe(frame)
                .map_err(|err| StageError::new(Stage::Sensor, err))?;
        }
        Ok(ambient)
    }

    fn classify(&mut self, gray: &GrayImage) -> Result<Classification, StageError> {
        let classifier = self.subsystems.classifier.as_mut().ok_or_else(|| {
            StageError::new(Stage::Inference, anyhow!("the model is not loaded"))
        })?;
        classifier
            .classify(gray)
            .map_err(|err| StageError::new(Stage::Inference, err))
    }

    /// Encode, store and upload the image.
    fn deliver(&mut self, gray: &GrayImage, report: &mut CycleReport) {
        let bitmap = match encode_bitmap(gray) {
            Ok(bitmap) => {
                report.encoding = Outcome::Succeeded;
                bitmap
            }
            Err(err) => {
                StageError::new(Stage::Encoding, err).log();
                report.encoding = Outcome::Failed;
                return;
            }
        };

        report.storage = match self.store(&bitmap) {
            Ok(()) => Outcome::Succeeded,
            Err(err) => {
                err.log();
                Outcome::Failed
            }
        };

        report.transport = match self.upload(&bitmap) {
            Ok(status) => {
                info!(%status, "Uploaded image");
                Outcome::Succeeded
            }
            Err(err) => {
                err.log();
                Outcome::Failed
            }
        };
    }

    fn store(&self, bitmap: &Bitmap) -> Result<(), StageError> {
        let store = self.subsystems.store.as_ref().ok_or_else(|| {
            StageError::new(Stage::Storage, anyhow!("image storage is not available"))
        })?;
        store
            .save(bitmap.as_bytes())
            .map_err(|err| StageError::new(Stage::Storage, err))
    }

    fn upload(&mut self, bitmap: &Bitmap) -> Result<StatusCode, StageError> {
        let transport = self.subsystems.transport.as_mut().ok_or_else(|| {
            StageError::new(Stage::Transport, anyhow!("the uploader is not available"))
        })?;
        let body = upload_form(
            &self.api_key,
            &self.context.classification,
            bitmap,
            &self.boundary,
        );
        send_body(&mut **transport, &body).map_err(|err| StageError::new(Stage::Transport, err))
    }

    fn log_summary(&self, ambient: Temperature, gray: &GrayImage) {
        let classification = &self.context.classification;
        let ambient = format!("{:#.2}", ambient);
        info!(
            fire = classification.fire,
            no_fire_logit = classification.no_fire_logit,
            fire_logit = classification.fire_logit,
            %ambient,
            "Classified image as {}",
            classification
        );
        info!("Grayscale image:\n{}", gray_grid(gray));
    }
}
