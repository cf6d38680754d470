use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lock as returned by `/v3/lock/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lock {
    #[serde(rename = "lockId")]
    pub lock_id: i64,
    /// Bluetooth name
    #[serde(rename = "lockName")]
    pub lock_name: String,
    #[serde(rename = "lockAlias")]
    pub lock_alias: String,
    #[serde(rename = "lockMac")]
    pub lock_mac: String,
    /// Battery level, percent
    #[serde(rename = "electricQuantity")]
    pub electric_quantity: i32,
    /// Hex-encoded capability bitfield
    #[serde(rename = "featureValue")]
    pub feature_value: String,
    #[serde(rename = "hasGateway")]
    pub has_gateway: i32,
    #[serde(rename = "lockData")]
    pub lock_data: String,
    #[serde(rename = "groupId")]
    pub group_id: i64,
    #[serde(rename = "groupName")]
    pub group_name: String,
    /// Initialization time, epoch milliseconds
    pub date: i64,
}

impl Lock {
    /// Alias when set, otherwise the Bluetooth name.
    pub fn display_name(&self) -> &str {
        if self.lock_alias.is_empty() {
            &self.lock_name
        } else {
            &self.lock_alias
        }
    }

    pub fn has_gateway(&self) -> bool {
        self.has_gateway == 1
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.date)
    }
}

/// Three-state switches in lock settings: 0 unknown, 1 on, 2 off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Unknown,
    On,
    Off,
}

impl Switch {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Switch::On,
            2 => Switch::Off,
            _ => Switch::Unknown,
        }
    }
}

/// Full lock settings as returned by `/v3/lock/detail`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LockDetail {
    pub lock_id: i64,
    pub lock_name: String,
    pub lock_alias: String,
    pub lock_mac: String,
    /// Admin keyboard passcode
    pub no_key_pwd: String,
    pub electric_quantity: i32,
    pub feature_value: String,
    /// Offset of the lock's timezone from UTC, milliseconds
    pub timezone_raw_offset: i64,
    pub model_num: String,
    pub hardware_revision: String,
    pub firmware_revision: String,
    /// Seconds; -1 means auto-lock is off
    pub auto_lock_time: i32,
    pub lock_sound: i32,
    pub privacy_lock: i32,
    pub tamper_alert: i32,
    pub reset_button: i32,
    /// 0 unknown, 1 left, 2 right
    pub open_direction: i32,
    /// 1 on, 2 off
    pub passage_mode: i32,
    pub passage_mode_auto_unlock: i32,
    pub date: i64,
}

impl LockDetail {
    pub fn auto_lock_enabled(&self) -> bool {
        self.auto_lock_time >= 0
    }

    pub fn lock_sound(&self) -> Switch {
        Switch::from_raw(self.lock_sound)
    }

    pub fn privacy_lock(&self) -> Switch {
        Switch::from_raw(self.privacy_lock)
    }

    pub fn tamper_alert(&self) -> Switch {
        Switch::from_raw(self.tamper_alert)
    }

    pub fn reset_button(&self) -> Switch {
        Switch::from_raw(self.reset_button)
    }

    pub fn passage_mode(&self) -> Switch {
        Switch::from_raw(self.passage_mode)
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.date)
    }
}

/// Filters for `/v3/lock/list`.
#[derive(Debug, Clone)]
pub struct LockListQuery {
    pub page_no: u32,
    pub page_size: u32,
    pub lock_alias: Option<String>,
    pub group_id: Option<i64>,
}

impl Default for LockListQuery {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: 20,
            lock_alias: None,
            group_id: None,
        }
    }
}

impl LockListQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("pageNo", self.page_no.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(alias) = self.lock_alias.as_deref().filter(|a| !a.is_empty()) {
            params.push(("lockAlias", alias.to_string()));
        }
        if let Some(group_id) = self.group_id.filter(|g| *g != 0) {
            params.push(("groupId", group_id.to_string()));
        }
        params
    }
}
