//! Unified error types for gpuleaf
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from NVML operations
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),

    /// Telemetry could not be acquired at all
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Startup capability probe failed
    #[error("Capability probe failed: {0}")]
    Capability(#[from] CapabilityError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// The loop gave up after too many failed ticks in a row
    #[error("Giving up after {0} consecutive failed ticks")]
    TooManyFailures(u32),

    /// Failed to install the Ctrl-C handler
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from NVML wrapper operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmlError {
    /// Failed to initialize NVML library
    #[error("Failed to initialize NVML: {0}")]
    InitializationFailed(String),

    /// NVML library not found
    #[error("NVML library not found. Is the NVIDIA driver installed?")]
    LibraryNotFound,

    /// Device not found at index
    #[error("GPU device not found at index {0}")]
    DeviceNotFound(u32),

    /// Operation not supported by this GPU
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}. Try running with sudo.")]
    InsufficientPermissions(String),

    /// GPU is lost (fallen off bus, etc.)
    #[error("GPU is lost or has become inaccessible")]
    GpuLost,

    /// Invalid argument passed to NVML
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown NVML error
    #[error("NVML error: {0}")]
    Unknown(String),
}

impl NvmlError {
    /// Whether the error means the library or device is gone for good
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NvmlError::InitializationFailed(_)
                | NvmlError::LibraryNotFound
                | NvmlError::DeviceNotFound(_)
                | NvmlError::GpuLost
        )
    }
}

/// Errors from acquiring a telemetry sample
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// The sampling mechanism could not be invoked at all
    #[error("Telemetry source unavailable: {0}")]
    Unavailable(String),

    /// The sampling tool ran but reported failure
    #[error("Telemetry command failed: {0}")]
    CommandFailed(String),

    /// A query against the device failed for this tick
    #[error("Telemetry query failed: {0}")]
    Query(String),

    /// Output contained no well-formed sample line
    #[error("No well-formed sample in telemetry output for GPU {0}")]
    NoSample(u32),
}

impl TelemetryError {
    /// Whether this error must stop the owning control loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, TelemetryError::Unavailable(_))
    }
}

impl From<NvmlError> for TelemetryError {
    fn from(err: NvmlError) -> Self {
        if err.is_terminal() {
            TelemetryError::Unavailable(err.to_string())
        } else {
            TelemetryError::Query(err.to_string())
        }
    }
}

/// Errors from the startup capability probe
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The probe could not be run
    #[error("Capability probe unavailable: {0}")]
    Unavailable(String),

    /// The probe output could not be understood
    #[error("Unexpected capability output: {0}")]
    Malformed(String),

    /// The device does not allow power limit management
    #[error("GPU {0} does not support power limit management")]
    NotManageable(u32),
}

impl From<NvmlError> for CapabilityError {
    fn from(err: NvmlError) -> Self {
        CapabilityError::Unavailable(err.to_string())
    }
}

/// Errors from applying a power limit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuationError {
    /// The device or tool rejected the new limit
    #[error("Power limit rejected: {0}")]
    Rejected(String),

    /// The actuation mechanism could not be invoked
    #[error("Actuator unavailable: {0}")]
    Unavailable(String),
}

impl From<NvmlError> for ActuationError {
    fn from(err: NvmlError) -> Self {
        if err.is_terminal() {
            ActuationError::Unavailable(err.to_string())
        } else {
            ActuationError::Rejected(err.to_string())
        }
    }
}

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Utilization threshold outside 0-100
    #[error("Invalid utilization threshold: {0}% (must be 0-100)")]
    InvalidThreshold(u32),

    /// Power range with min above max
    #[error("Invalid power range: min {min}W is above max {max}W")]
    InvalidPowerRange { min: f64, max: f64 },
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Config file exists but could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
