//! ONNX Runtime session configuration.

use crate::error::{ConfigError, Result};
#[allow(unused_imports)]
use ort::execution_providers::*;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::fmt;
use std::str::FromStr;

/// Device the ONNX sessions run on.
///
/// Every device except [`ExecutionDevice::Cpu`] needs its Cargo feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionDevice {
    #[default]
    Cpu,
    Cuda,
    TensorRt,
    CoreMl,
    DirectMl,
    OpenVino,
}

impl ExecutionDevice {
    pub const ALL: [ExecutionDevice; 6] = [
        ExecutionDevice::Cpu,
        ExecutionDevice::Cuda,
        ExecutionDevice::TensorRt,
        ExecutionDevice::CoreMl,
        ExecutionDevice::DirectMl,
        ExecutionDevice::OpenVino,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ExecutionDevice::Cpu => "cpu",
            ExecutionDevice::Cuda => "cuda",
            ExecutionDevice::TensorRt => "tensorrt",
            ExecutionDevice::CoreMl => "coreml",
            ExecutionDevice::DirectMl => "directml",
            ExecutionDevice::OpenVino => "openvino",
        }
    }

    /// Cargo feature that enables this device; the name doubles as feature.
    pub const fn feature(self) -> &'static str {
        self.name()
    }

    /// Whether this build can use the device.
    pub const fn is_available(self) -> bool {
        match self {
            ExecutionDevice::Cpu => true,
            ExecutionDevice::Cuda => cfg!(feature = "cuda"),
            ExecutionDevice::TensorRt => cfg!(feature = "tensorrt"),
            ExecutionDevice::CoreMl => cfg!(feature = "coreml"),
            ExecutionDevice::DirectMl => cfg!(feature = "directml"),
            ExecutionDevice::OpenVino => cfg!(feature = "openvino"),
        }
    }

    /// Session builder with this device's execution provider registered.
    ///
    /// CPU needs no provider. Other devices fail with
    /// [`ConfigError::UnsupportedDevice`] unless their feature is enabled.
    pub fn session_builder(self) -> Result<SessionBuilder> {
        if !self.is_available() {
            return Err(ConfigError::UnsupportedDevice(self.to_string(), self.feature()).into());
        }

        let builder = Session::builder()?;

        tracing::debug!(device = %self, "configuring execution provider");

        let builder = match self {
            #[cfg(feature = "cuda")]
            ExecutionDevice::Cuda => {
                builder.with_execution_providers([CUDAExecutionProvider::default().build()])?
            }
            #[cfg(feature = "tensorrt")]
            ExecutionDevice::TensorRt => {
                builder.with_execution_providers([TensorRTExecutionProvider::default().build()])?
            }
            #[cfg(feature = "coreml")]
            ExecutionDevice::CoreMl => {
                builder.with_execution_providers([CoreMLExecutionProvider::default().build()])?
            }
            #[cfg(feature = "directml")]
            ExecutionDevice::DirectMl => {
                builder.with_execution_providers([DirectMLExecutionProvider::default().build()])?
            }
            #[cfg(feature = "openvino")]
            ExecutionDevice::OpenVino => builder.with_execution_providers([
                OpenVINOExecutionProvider::default()
                    .with_device_type("HETERO:GPU,CPU")
                    .with_cache_dir(".cache/ort")
                    .build(),
            ])?,
            _ => builder,
        };

        Ok(builder)
    }
}

impl fmt::Display for ExecutionDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionDevice {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|device| device.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownDevice(s.to_owned()))
    }
}
