// In-band response codes
//
// Every failed command in a batch comes back as
// `{"cmd": ..., "error": {"rspCode": N, "detail": "..."}}`. The numeric
// codes follow the device API sheet; anything we don't know about is kept
// verbatim in `Unknown`.

use std::fmt;

/// Named `rspCode` values from the camera's API sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingParameters,
    OutOfMemory,
    CheckError,
    ParametersError,
    MaxSessions,
    /// The session token is missing or no longer valid.
    AuthRequired,
    /// Wrong username or password.
    LoginFailed,
    OperationTimeout,
    NotSupported,
    ProtocolError,
    ReadFailed,
    GetConfigFailed,
    SetConfigFailed,
    AllocFailed,
    SocketFailed,
    SendFailed,
    ReceiveFailed,
    OpenFileFailed,
    ReadFileFailed,
    WriteFileFailed,
    TokenError,
    StringTooLong,
    MissingParam,
    CommandError,
    InternalError,
    AbilityError,
    InvalidUser,
    UserExists,
    MaxUsers,
    SameVersion,
    UpgradeBusy,
    IpConflict,
    CloudBindEmailFirst,
    CloudUnbindCamera,
    CloudInfoTimeout,
    CloudPasswordError,
    CloudUidError,
    CloudUserMissing,
    CloudUnbindFailed,
    CloudNotSupported,
    CloudServerFailed,
    CloudBindFailed,
    CloudUnknown,
    CloudNeedVerifyCode,
    Unknown(i64),
}

impl ErrorCode {
    /// Map a raw `rspCode` to its named variant.
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => Self::MissingParameters,
            -2 => Self::OutOfMemory,
            -3 => Self::CheckError,
            -4 => Self::ParametersError,
            -5 => Self::MaxSessions,
            -6 => Self::AuthRequired,
            -7 => Self::LoginFailed,
            -8 => Self::OperationTimeout,
            -9 => Self::NotSupported,
            -10 => Self::ProtocolError,
            -11 => Self::ReadFailed,
            -12 => Self::GetConfigFailed,
            -13 => Self::SetConfigFailed,
            -14 => Self::AllocFailed,
            -15 => Self::SocketFailed,
            -16 => Self::SendFailed,
            -17 => Self::ReceiveFailed,
            -18 => Self::OpenFileFailed,
            -19 => Self::ReadFileFailed,
            -20 => Self::WriteFileFailed,
            -21 => Self::TokenError,
            -22 => Self::StringTooLong,
            -23 => Self::MissingParam,
            -24 => Self::CommandError,
            -25 => Self::InternalError,
            -26 => Self::AbilityError,
            -27 => Self::InvalidUser,
            -28 => Self::UserExists,
            -29 => Self::MaxUsers,
            -30 => Self::SameVersion,
            -31 => Self::UpgradeBusy,
            -32 => Self::IpConflict,
            -34 => Self::CloudBindEmailFirst,
            -35 => Self::CloudUnbindCamera,
            -36 => Self::CloudInfoTimeout,
            -37 => Self::CloudPasswordError,
            -38 => Self::CloudUidError,
            -39 => Self::CloudUserMissing,
            -40 => Self::CloudUnbindFailed,
            -41 => Self::CloudNotSupported,
            -42 => Self::CloudServerFailed,
            -43 => Self::CloudBindFailed,
            -44 => Self::CloudUnknown,
            -45 => Self::CloudNeedVerifyCode,
            other => Self::Unknown(other),
        }
    }

    /// The raw numeric `rspCode`.
    pub fn code(self) -> i64 {
        match self {
            Self::MissingParameters => -1,
            Self::OutOfMemory => -2,
            Self::CheckError => -3,
            Self::ParametersError => -4,
            Self::MaxSessions => -5,
            Self::AuthRequired => -6,
            Self::LoginFailed => -7,
            Self::OperationTimeout => -8,
            Self::NotSupported => -9,
            Self::ProtocolError => -10,
            Self::ReadFailed => -11,
            Self::GetConfigFailed => -12,
            Self::SetConfigFailed => -13,
            Self::AllocFailed => -14,
            Self::SocketFailed => -15,
            Self::SendFailed => -16,
            Self::ReceiveFailed => -17,
            Self::OpenFileFailed => -18,
            Self::ReadFileFailed => -19,
            Self::WriteFileFailed => -20,
            Self::TokenError => -21,
            Self::StringTooLong => -22,
            Self::MissingParam => -23,
            Self::CommandError => -24,
            Self::InternalError => -25,
            Self::AbilityError => -26,
            Self::InvalidUser => -27,
            Self::UserExists => -28,
            Self::MaxUsers => -29,
            Self::SameVersion => -30,
            Self::UpgradeBusy => -31,
            Self::IpConflict => -32,
            Self::CloudBindEmailFirst => -34,
            Self::CloudUnbindCamera => -35,
            Self::CloudInfoTimeout => -36,
            Self::CloudPasswordError => -37,
            Self::CloudUidError => -38,
            Self::CloudUserMissing => -39,
            Self::CloudUnbindFailed => -40,
            Self::CloudNotSupported => -41,
            Self::CloudServerFailed => -42,
            Self::CloudBindFailed => -43,
            Self::CloudUnknown => -44,
            Self::CloudNeedVerifyCode => -45,
            Self::Unknown(code) => code,
        }
    }

    /// Short human description, as printed in the API sheet.
    pub fn description(self) -> &'static str {
        match self {
            Self::MissingParameters | Self::MissingParam => "missing parameters",
            Self::OutOfMemory => "used up memory",
            Self::CheckError => "check error",
            Self::ParametersError => "parameters error",
            Self::MaxSessions => "reached the max session number",
            Self::AuthRequired => "login required",
            Self::LoginFailed => "login error",
            Self::OperationTimeout => "operation timeout",
            Self::NotSupported => "not supported",
            Self::ProtocolError => "protocol error",
            Self::ReadFailed => "failed to read operation",
            Self::GetConfigFailed => "failed to get configuration",
            Self::SetConfigFailed => "failed to set configuration",
            Self::AllocFailed => "failed to apply for memory",
            Self::SocketFailed => "failed to create socket",
            Self::SendFailed => "failed to send data",
            Self::ReceiveFailed => "failed to receive data",
            Self::OpenFileFailed => "failed to open file",
            Self::ReadFileFailed => "failed to read file",
            Self::WriteFileFailed => "failed to write file",
            Self::TokenError => "token error",
            Self::StringTooLong => "string exceeds length limit",
            Self::CommandError => "command error",
            Self::InternalError => "internal error",
            Self::AbilityError => "ability error",
            Self::InvalidUser => "invalid user",
            Self::UserExists => "user already exists",
            Self::MaxUsers => "reached the maximum number of users",
            Self::SameVersion => "same version",
            Self::UpgradeBusy => "another upgrade is in progress",
            Self::IpConflict => "ip conflicts with an address in use",
            Self::CloudBindEmailFirst => "cloud login needs a bound email",
            Self::CloudUnbindCamera => "cloud login with unbound camera",
            Self::CloudInfoTimeout => "cloud login information timed out",
            Self::CloudPasswordError => "cloud login password error",
            Self::CloudUidError => "cloud bind uid error",
            Self::CloudUserMissing => "cloud user does not exist",
            Self::CloudUnbindFailed => "cloud unbind failed",
            Self::CloudNotSupported => "cloud not supported",
            Self::CloudServerFailed => "cloud login server failed",
            Self::CloudBindFailed => "cloud bind failed",
            Self::CloudUnknown => "cloud unknown error",
            Self::CloudNeedVerifyCode => "cloud bind needs a verify code",
            Self::Unknown(_) => "unknown error",
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for raw in (-45..=-1).filter(|c| *c != -33) {
            let code = ErrorCode::from_code(raw);
            assert!(!matches!(code, ErrorCode::Unknown(_)), "{raw} should be named");
            assert_eq!(code.code(), raw);
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let code = ErrorCode::from_code(-480);
        assert_eq!(code, ErrorCode::Unknown(-480));
        assert_eq!(code.code(), -480);
        assert_eq!(code.to_string(), "unknown error (-480)");
    }

    #[test]
    fn auth_codes() {
        assert_eq!(ErrorCode::from(-6), ErrorCode::AuthRequired);
        assert_eq!(ErrorCode::from(-7), ErrorCode::LoginFailed);
    }
}
