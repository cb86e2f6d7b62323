//! J2190 Negative Response Codes (NRC)

use std::fmt;

use super::SecurityError;

/// Negative Response Codes carried as the trailing byte of a mode $7F reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegativeResponseCode {
    GeneralReject,
    ModeNotSupported,
    SubFunctionNotSupported,
    BusyRepeatRequest,
    ConditionsNotCorrect,
    RoutineNotComplete,
    RequestOutOfRange,
    SecurityAccessDenied,
    SecurityAccessAllowed,
    InvalidKey,
    ExceededNumberOfAttempts,
    RequiredTimeDelayNotExpired,
    DownloadNotAccepted,
    ImproperDownloadType,
    CannotDownloadToAddress,
    CannotDownloadBytes,
    UploadNotAccepted,
    ImproperUploadType,
    CannotUploadFromAddress,
    CannotUploadBytes,
    TransferSuspended,
    TransferAborted,
    IllegalAddressInBlockTransfer,
    IllegalByteCountInBlockTransfer,
    IllegalBlockTransferType,
    BlockTransferChecksumError,
    ResponsePending,
    IncorrectByteCountDuringBlockTransfer,

    /// Unknown/reserved NRC
    Unknown(u8),
}

impl NegativeResponseCode {
    /// Security errors for the codes the unlock flow recognizes.
    ///
    /// 0x34 is deliberately absent: it only means "accepted" when it arrives as
    /// the data byte of a positive key reply, never as a negative response.
    pub fn security_error(self) -> Option<SecurityError> {
        match self {
            Self::SecurityAccessDenied => Some(SecurityError::AccessDenied),
            Self::InvalidKey => Some(SecurityError::InvalidKey),
            Self::ExceededNumberOfAttempts => Some(SecurityError::ExceededAttempts),
            Self::RequiredTimeDelayNotExpired => Some(SecurityError::TimeDelayNotExpired),
            _ => None,
        }
    }
}

impl From<u8> for NegativeResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0x10 => Self::GeneralReject,
            0x11 => Self::ModeNotSupported,
            0x12 => Self::SubFunctionNotSupported,
            0x21 => Self::BusyRepeatRequest,
            0x22 => Self::ConditionsNotCorrect,
            0x23 => Self::RoutineNotComplete,
            0x31 => Self::RequestOutOfRange,
            0x33 => Self::SecurityAccessDenied,
            0x34 => Self::SecurityAccessAllowed,
            0x35 => Self::InvalidKey,
            0x36 => Self::ExceededNumberOfAttempts,
            0x37 => Self::RequiredTimeDelayNotExpired,
            0x40 => Self::DownloadNotAccepted,
            0x41 => Self::ImproperDownloadType,
            0x42 => Self::CannotDownloadToAddress,
            0x43 => Self::CannotDownloadBytes,
            0x50 => Self::UploadNotAccepted,
            0x51 => Self::ImproperUploadType,
            0x52 => Self::CannotUploadFromAddress,
            0x53 => Self::CannotUploadBytes,
            0x71 => Self::TransferSuspended,
            0x72 => Self::TransferAborted,
            0x74 => Self::IllegalAddressInBlockTransfer,
            0x75 => Self::IllegalByteCountInBlockTransfer,
            0x76 => Self::IllegalBlockTransferType,
            0x77 => Self::BlockTransferChecksumError,
            0x78 => Self::ResponsePending,
            0x79 => Self::IncorrectByteCountDuringBlockTransfer,
            other => Self::Unknown(other),
        }
    }
}

impl From<NegativeResponseCode> for u8 {
    fn from(nrc: NegativeResponseCode) -> Self {
        match nrc {
            NegativeResponseCode::GeneralReject => 0x10,
            NegativeResponseCode::ModeNotSupported => 0x11,
            NegativeResponseCode::SubFunctionNotSupported => 0x12,
            NegativeResponseCode::BusyRepeatRequest => 0x21,
            NegativeResponseCode::ConditionsNotCorrect => 0x22,
            NegativeResponseCode::RoutineNotComplete => 0x23,
            NegativeResponseCode::RequestOutOfRange => 0x31,
            NegativeResponseCode::SecurityAccessDenied => 0x33,
            NegativeResponseCode::SecurityAccessAllowed => 0x34,
            NegativeResponseCode::InvalidKey => 0x35,
            NegativeResponseCode::ExceededNumberOfAttempts => 0x36,
            NegativeResponseCode::RequiredTimeDelayNotExpired => 0x37,
            NegativeResponseCode::DownloadNotAccepted => 0x40,
            NegativeResponseCode::ImproperDownloadType => 0x41,
            NegativeResponseCode::CannotDownloadToAddress => 0x42,
            NegativeResponseCode::CannotDownloadBytes => 0x43,
            NegativeResponseCode::UploadNotAccepted => 0x50,
            NegativeResponseCode::ImproperUploadType => 0x51,
            NegativeResponseCode::CannotUploadFromAddress => 0x52,
            NegativeResponseCode::CannotUploadBytes => 0x53,
            NegativeResponseCode::TransferSuspended => 0x71,
            NegativeResponseCode::TransferAborted => 0x72,
            NegativeResponseCode::IllegalAddressInBlockTransfer => 0x74,
            NegativeResponseCode::IllegalByteCountInBlockTransfer => 0x75,
            NegativeResponseCode::IllegalBlockTransferType => 0x76,
            NegativeResponseCode::BlockTransferChecksumError => 0x77,
            NegativeResponseCode::ResponsePending => 0x78,
            NegativeResponseCode::IncorrectByteCountDuringBlockTransfer => 0x79,
            NegativeResponseCode::Unknown(v) => v,
        }
    }
}

impl fmt::UpperHex for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: u8 = (*self).into();
        fmt::UpperHex::fmt(&value, f)
    }
}

impl fmt::Display for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralReject => write!(f, "GeneralReject"),
            Self::ModeNotSupported => write!(f, "ModeNotSupported"),
            Self::SubFunctionNotSupported => write!(f, "SubFunctionNotSupported"),
            Self::BusyRepeatRequest => write!(f, "BusyRepeatRequest"),
            Self::ConditionsNotCorrect => write!(f, "ConditionsNotCorrect"),
            Self::RoutineNotComplete => write!(f, "RoutineNotComplete"),
            Self::RequestOutOfRange => write!(f, "RequestOutOfRange"),
            Self::SecurityAccessDenied => write!(f, "SecurityAccessDenied"),
            Self::SecurityAccessAllowed => write!(f, "SecurityAccessAllowed"),
            Self::InvalidKey => write!(f, "InvalidKey"),
            Self::ExceededNumberOfAttempts => write!(f, "ExceededNumberOfAttempts"),
            Self::RequiredTimeDelayNotExpired => write!(f, "RequiredTimeDelayNotExpired"),
            Self::DownloadNotAccepted => write!(f, "DownloadNotAccepted"),
            Self::ImproperDownloadType => write!(f, "ImproperDownloadType"),
            Self::CannotDownloadToAddress => write!(f, "CannotDownloadToAddress"),
            Self::CannotDownloadBytes => write!(f, "CannotDownloadBytes"),
            Self::UploadNotAccepted => write!(f, "UploadNotAccepted"),
            Self::ImproperUploadType => write!(f, "ImproperUploadType"),
            Self::CannotUploadFromAddress => write!(f, "CannotUploadFromAddress"),
            Self::CannotUploadBytes => write!(f, "CannotUploadBytes"),
            Self::TransferSuspended => write!(f, "TransferSuspended"),
            Self::TransferAborted => write!(f, "TransferAborted"),
            Self::IllegalAddressInBlockTransfer => write!(f, "IllegalAddressInBlockTransfer"),
            Self::IllegalByteCountInBlockTransfer => {
                write!(f, "IllegalByteCountInBlockTransfer")
            }
            Self::IllegalBlockTransferType => write!(f, "IllegalBlockTransferType"),
            Self::BlockTransferChecksumError => write!(f, "BlockTransferChecksumError"),
            Self::ResponsePending => write!(f, "ResponsePending"),
            Self::IncorrectByteCountDuringBlockTransfer => {
                write!(f, "IncorrectByteCountDuringBlockTransfer")
            }
            Self::Unknown(v) => write!(f, "Unknown(0x{:02X})", v),
        }
    }
}
