use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optional settings for an eKey. Unset fields are left to the platform's
/// defaults and are not sent.
#[derive(Debug, Clone, Default)]
pub struct SendKeyOptions {
    pub remarks: Option<String>,
    /// Allow remote unlock through a gateway
    pub remote_enable: Option<bool>,
    /// Grant admin rights on the lock
    pub key_right: Option<bool>,
    /// Create a TTLock account when the receiver is an email or phone number
    pub create_user: Option<bool>,
}

impl SendKeyOptions {
    // remoteEnable and createUser use 1/2 for yes/no, keyRight uses 1/0.
    fn push_params(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(remarks) = self.remarks.as_deref().filter(|r| !r.is_empty()) {
            params.push(("remarks", remarks.to_string()));
        }
        if let Some(remote) = self.remote_enable {
            params.push(("remoteEnable", if remote { "1" } else { "2" }.to_string()));
        }
        if let Some(admin) = self.key_right {
            params.push(("keyRight", if admin { "1" } else { "0" }.to_string()));
        }
        if let Some(create) = self.create_user {
            params.push(("createUser", if create { "1" } else { "2" }.to_string()));
        }
    }
}

/// Parameters for `/v3/key/send`.
#[derive(Debug, Clone)]
pub struct SendKeyRequest {
    pub lock_id: i64,
    pub receiver_username: String,
    pub key_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub options: SendKeyOptions,
}

impl SendKeyRequest {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lockId", self.lock_id.to_string()),
            ("receiverUsername", self.receiver_username.clone()),
            ("keyName", self.key_name.clone()),
            ("startDate", self.start.timestamp_millis().to_string()),
            ("endDate", self.end.timestamp_millis().to_string()),
        ];
        self.options.push_params(&mut params);
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentKey {
    #[serde(rename = "keyId")]
    pub key_id: i64,
}
