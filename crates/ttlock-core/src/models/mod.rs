//! Data models for TTLock Open Platform entities.
//!
//! - `Lock`, `LockDetail`: Locks on the account and their settings
//! - `Passcode`, `RandomPasscode`: Keyboard passcodes
//! - `SentKey`: eKeys sent to other users
//!
//! Request structs (`LockListQuery`, `RandomPasscodeRequest`, ...) hold typed
//! parameters and build the form or query pairs for their endpoint.

pub mod key;
pub mod lock;
pub mod passcode;

pub use key::{SendKeyOptions, SendKeyRequest, SentKey};
pub use lock::{Lock, LockDetail, LockListQuery, Switch};
pub use passcode::{
    Passcode, PasscodeListQuery, PasscodeOrder, PasscodeType, RandomPasscode, RandomPasscodeRequest,
};
