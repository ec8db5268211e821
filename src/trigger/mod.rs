// SPDX-License-Identifier: GPL-3.0-or-later
mod edge;
mod scheduler;
mod settings;

pub(crate) use scheduler::CaptureScheduler;
pub(crate) use settings::TriggerSettings;
