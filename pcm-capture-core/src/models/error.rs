use std::fmt;

use thiserror::Error;

/// Status codes reported by capture-session operations.
///
/// The numeric values are stable and `Success` is always `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CaptureStatus {
    Success = 0,
    OutOfMemory,
    InvalidArgument,
    InvalidState,
    BackendError,
    DeviceAlreadyInitialized,
    DeviceNotInitialized,
    IoError,
    RuntimeError,
}

impl CaptureStatus {
    const ALL: [CaptureStatus; 9] = [
        Self::Success,
        Self::OutOfMemory,
        Self::InvalidArgument,
        Self::InvalidState,
        Self::BackendError,
        Self::DeviceAlreadyInitialized,
        Self::DeviceNotInitialized,
        Self::IoError,
        Self::RuntimeError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidState => "INVALID_STATE",
            Self::BackendError => "BACKEND_ERROR",
            Self::DeviceAlreadyInitialized => "DEVICE_ALREADY_INITIALIZED",
            Self::DeviceNotInitialized => "DEVICE_NOT_INITIALIZED",
            Self::IoError => "IO_ERROR",
            Self::RuntimeError => "RUNTIME_ERROR",
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String form of a raw capture status code, `None` for unknown codes.
pub fn capture_status_to_string(code: i32) -> Option<&'static str> {
    CaptureStatus::from_code(code).map(CaptureStatus::as_str)
}

/// Status codes reported by ring-buffer operations.
///
/// `WriteOverflow`, `ReadIncomplete` and `ReadEmpty` describe successful
/// calls: data was moved, but not exactly what the caller hoped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BufferStatus {
    Success = 0,
    OutOfMemory,
    InvalidArgument,
    ReadIncomplete,
    ReadEmpty,
    WriteOverflow,
}

impl BufferStatus {
    const ALL: [BufferStatus; 6] = [
        Self::Success,
        Self::OutOfMemory,
        Self::InvalidArgument,
        Self::ReadIncomplete,
        Self::ReadEmpty,
        Self::WriteOverflow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ReadIncomplete => "READ_INCOMPLETE",
            Self::ReadEmpty => "READ_EMPTY",
            Self::WriteOverflow => "WRITE_OVERFLOW",
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String form of a raw buffer status code, `None` for unknown codes.
pub fn buffer_status_to_string(code: i32) -> Option<&'static str> {
    BufferStatus::from_code(code).map(BufferStatus::as_str)
}

/// Failures of ring-buffer construction, reads and writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl BufferError {
    pub fn status(&self) -> BufferStatus {
        match self {
            Self::OutOfMemory => BufferStatus::OutOfMemory,
            Self::InvalidArgument(_) => BufferStatus::InvalidArgument,
        }
    }
}

/// Errors that can occur during audio capture operations.
///
/// Every variant maps to exactly one non-success [`CaptureStatus`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("audio backend error: {0}")]
    Backend(String),

    #[error("device already initialized")]
    DeviceAlreadyInitialized,

    #[error("device not initialized")]
    DeviceNotInitialized,

    #[error("read timed out after {read} of {expected} samples")]
    Io { read: usize, expected: usize },

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl CaptureError {
    pub fn status(&self) -> CaptureStatus {
        match self {
            Self::OutOfMemory => CaptureStatus::OutOfMemory,
            Self::InvalidArgument(_) => CaptureStatus::InvalidArgument,
            Self::InvalidState(_) => CaptureStatus::InvalidState,
            Self::Backend(_) => CaptureStatus::BackendError,
            Self::DeviceAlreadyInitialized => CaptureStatus::DeviceAlreadyInitialized,
            Self::DeviceNotInitialized => CaptureStatus::DeviceNotInitialized,
            Self::Io { .. } => CaptureStatus::IoError,
            Self::Runtime(_) => CaptureStatus::RuntimeError,
        }
    }
}

impl From<BufferError> for CaptureError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::OutOfMemory => Self::OutOfMemory,
            BufferError::InvalidArgument(what) => Self::InvalidArgument(what.into()),
        }
    }
}
