use thiserror::Error;

/// Declares the named application codes once. `from_code`, `code` and
/// `description` are generated from the same table.
macro_rules! error_codes {
    ($($(#[$meta:meta])* $name:ident = $code:literal => $desc:literal,)*) => {
        /// Application-level error codes carried in the `errcode` field of
        /// every TTLock response.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($(#[$meta])* $name,)*
            /// A code the platform returned that has no named variant.
            Unknown(i32),
        }

        impl ErrorCode {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => ErrorCode::$name,)*
                    other => ErrorCode::Unknown(other),
                }
            }

            pub fn code(self) -> i32 {
                match self {
                    $(ErrorCode::$name => $code,)*
                    ErrorCode::Unknown(code) => code,
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $(ErrorCode::$name => $desc,)*
                    ErrorCode::Unknown(_) => "unknown error",
                }
            }
        }
    };
}

error_codes! {
    // ----- Common -----
    OperationFailed = 1 => "operation failed",
    ClientIdNotExist = 10000 => "client_id does not exist",
    InvalidClient = 10001 => "invalid client, client_id or client_secret is wrong",
    TokenNotExist = 10003 => "token does not exist",
    /// The access token expired or its grant was revoked.
    TokenUnauthorized = 10004 => "token unauthorized, it has expired or been revoked",
    InvalidUsernameOrPassword = 10007 => "invalid username or password",
    InvalidRefreshToken = 10011 => "invalid refresh_token",
    NotLockAdmin = 20002 => "not the lock admin",
    InvalidUsernameFormat = 30002 => "username may only contain letters and digits",
    UserAlreadyExists = 30003 => "user already exists",
    InvalidDeleteUserId = 30004 => "only accounts registered by this app can be deleted",
    PasswordMustBeMd5 = 30005 => "password must be MD5 hashed",
    RateLimitExceeded = 30006 => "API call limit exceeded",
    InvalidRequestTime = 80000 => "request date must be within five minutes of the current time",
    InvalidJsonFormat = 80002 => "invalid JSON format",
    SystemInternalError = 90000 => "internal system error",
    InvalidParameter = -3 => "invalid parameter",
    /// Most endpoints only accept tokens issued to the lock's admin.
    PermissionDenied = -2018 => "permission denied",
    DeleteOrTransferLocks = -4063 => "delete or transfer all locks in the account first",

    // ----- Lock -----
    LockNotExist = -1003 => "lock does not exist",
    LockFrozen = -2025 => "lock is frozen",
    CannotTransferLockToSelf = -3011 => "cannot transfer a lock to yourself",
    LockOperationNotSupported = -4043 => "lock does not support this operation",
    StorageFull = -4056 => "storage is full",
    NbDeviceNotRegistered = -4067 => "NB device is not registered",
    AutoLockTimeLimitExceeded = -4082 => "auto-lock time out of range",

    // ----- eKey -----
    KeyNotExist = -1008 => "eKey does not exist",
    GroupNameExists = -1016 => "group name already exists",
    GroupNotExist = -1018 => "group does not exist",
    AccountBoundCannotReceiveKey = -1027 => "account is bound to another account and cannot receive eKeys",
    CannotSendKeyToSelf = -2019 => "cannot send an eKey to yourself",
    CannotSendKeyToAdmin = -2020 => "cannot send an eKey to the admin",
    CannotModifyKeyValidity = -2023 => "eKey validity cannot be changed now",
    ReceiverNotRegistered = -4064 => "receiver account is not registered",

    // ----- Passcode -----
    LockNoPasscodeData = -1007 => "lock has no passcode data",
    PasscodeNotExist = -2009 => "passcode does not exist",
    InvalidPasscodeLength = -3006 => "passcode must be 4 to 9 digits",
    PasscodeAlreadyExists = -3007 => "the same passcode already exists",
    CannotModifyUnusedPasscode = -3008 => "cannot modify a passcode that was never used on the lock",
    CustomPasscodeSpaceFull = -3009 => "custom passcode space is full",

    // ----- Gateway & Wi-Fi lock -----
    NoAvailableGateway = -2012 => "no gateway available near the lock",
    GatewayOffline = -3002 => "gateway is offline",
    GatewayBusy = -3003 => "gateway is busy",
    CannotTransferGatewayToSelf = -3016 => "cannot transfer a gateway to yourself",
    WifiLockNotConfigured = -3034 => "Wi-Fi lock network is not configured",
    WifiInPowerSavingMode = -3035 => "Wi-Fi lock is in power saving mode",
    LockOffline = -3036 => "lock is offline",
    LockBusy = -3037 => "lock is busy",
    GatewayNotExist = -4037 => "gateway does not exist",

    // ----- IC card & fingerprint -----
    IcCardNotExist = -1021 => "IC card does not exist",
    FingerprintNotExist = -1023 => "fingerprint does not exist",
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("TTLock error {errcode}: {message}", errcode = .code.code())]
    Api { code: ErrorCode, message: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Access token could not be renewed - the client must be rebuilt")]
    CredentialDead,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Build the error for a non-zero `errcode`. The server's own message wins
    /// when it sent one.
    pub fn from_errcode(errcode: i32, errmsg: &str) -> Self {
        let code = ErrorCode::from_code(errcode);
        let message = if errmsg.trim().is_empty() {
            code.description().to_string()
        } else {
            errmsg.to_string()
        };
        ApiError::Api { code, message }
    }

    /// The application code, for errors that came from an `errcode`.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Check whether an error (or anything in its context chain) is the given
/// TTLock application error.
pub fn is_error_code(err: &anyhow::Error, code: ErrorCode) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ApiError>())
        .any(|api| api.code() == Some(code))
}
