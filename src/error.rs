// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;

/// The pipeline stage a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Sensor,
    Calibration,
    Inference,
    Encoding,
    Storage,
    Transport,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Sensor => "sensor",
            Self::Calibration => "calibration",
            Self::Inference => "inference",
            Self::Encoding => "encoding",
            Self::Storage => "storage",
            Self::Transport => "transport",
        })
    }
}

/// A failure tagged with the stage it happened in.
///
/// Stage failures are never fatal. The pipeline logs them and carries on with whatever stages
/// don't depend on the failed one.
pub(crate) struct StageError {
    stage: Stage,
    source: anyhow::Error,
}

impl StageError {
    pub(crate) fn new(stage: Stage, source: anyhow::Error) -> Self {
        Self { stage, source }
    }

    /// Log this error at the error level, tagged with the stage.
    pub(crate) fn log(&self) {
        tracing::error!(stage = %self.stage, error = ?self.source, "{}", self);
    }
}

impl fmt::Debug for StageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StageError")
            .field("stage", &self.stage)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.stage {
            Stage::Sensor => write!(f, "Unable to read a frame from the sensor: {}", self.source),
            Stage::Calibration => write!(f, "Sensor calibration failed: {}", self.source),
            Stage::Inference => write!(f, "Fire classification failed: {}", self.source),
            Stage::Encoding => write!(f, "Unable to encode bitmap: {}", self.source),
            Stage::Storage => write!(f, "Unable to store bitmap: {}", self.source),
            Stage::Transport => write!(f, "Upload failed: {}", self.source),
        }
    }
}

impl StdError for StageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source)
    }
}
