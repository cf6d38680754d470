use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of keyboard passcode the cloud can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasscodeType {
    /// Usable once within 6 hours of the start time
    OneTime = 1,
    /// Valid forever from the start time; must be used within 24 hours of it
    Permanent = 2,
    /// Valid between start and end; must be used within 24 hours of the start
    Period = 3,
    /// Using it on the lock erases every passcode used before it
    Delete = 4,
    WeekendCyclic = 5,
    DailyCyclic = 6,
    WorkdayCyclic = 7,
    MondayCyclic = 8,
    TuesdayCyclic = 9,
    WednesdayCyclic = 10,
    ThursdayCyclic = 11,
    FridayCyclic = 12,
    SaturdayCyclic = 13,
    SundayCyclic = 14,
}

impl PasscodeType {
    const ALL: [PasscodeType; 14] = [
        PasscodeType::OneTime,
        PasscodeType::Permanent,
        PasscodeType::Period,
        PasscodeType::Delete,
        PasscodeType::WeekendCyclic,
        PasscodeType::DailyCyclic,
        PasscodeType::WorkdayCyclic,
        PasscodeType::MondayCyclic,
        PasscodeType::TuesdayCyclic,
        PasscodeType::WednesdayCyclic,
        PasscodeType::ThursdayCyclic,
        PasscodeType::FridayCyclic,
        PasscodeType::SaturdayCyclic,
        PasscodeType::SundayCyclic,
    ];

    /// Wire value of `keyboardPwdType`, 1 through 14.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw - 1)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn is_cyclic(self) -> bool {
        self.as_raw() >= PasscodeType::WeekendCyclic as i32
    }
}

/// Sort order for `/v3/lock/listKeyboardPwd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasscodeOrder {
    NameAscending,
    #[default]
    CreatedDescending,
    NameDescending,
}

impl PasscodeOrder {
    pub fn as_raw(self) -> i32 {
        match self {
            PasscodeOrder::NameAscending => 0,
            PasscodeOrder::CreatedDescending => 1,
            PasscodeOrder::NameDescending => 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Passcode {
    pub keyboard_pwd_id: i64,
    pub lock_id: i64,
    pub keyboard_pwd: String,
    pub keyboard_pwd_name: String,
    pub keyboard_pwd_type: i32,
    pub start_date: i64,
    pub end_date: i64,
    pub send_date: i64,
    pub is_custom: i32,
    pub sender_username: String,
}

impl Passcode {
    pub fn kind(&self) -> Option<PasscodeType> {
        PasscodeType::from_raw(self.keyboard_pwd_type)
    }

    pub fn is_custom(&self) -> bool {
        self.is_custom == 1
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.start_date)
    }

    /// `None` for passcodes without an end (permanent, one-time).
    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        if self.end_date == 0 {
            None
        } else {
            DateTime::<Utc>::from_timestamp_millis(self.end_date)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomPasscode {
    #[serde(rename = "keyboardPwd")]
    pub keyboard_pwd: String,
    #[serde(rename = "keyboardPwdId")]
    pub keyboard_pwd_id: i64,
}

/// Parameters for `/v3/keyboardPwd/get`.
///
/// Passcode validity is precise to the hour, so start and end should fall on
/// the hour.
#[derive(Debug, Clone)]
pub struct RandomPasscodeRequest {
    pub lock_id: i64,
    pub kind: PasscodeType,
    pub name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl RandomPasscodeRequest {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lockId", self.lock_id.to_string()),
            ("keyboardPwdType", self.kind.as_raw().to_string()),
            ("startDate", self.start.timestamp_millis().to_string()),
        ];
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            params.push(("keyboardPwdName", name.to_string()));
        }
        if let Some(end) = self.end {
            params.push(("endDate", end.timestamp_millis().to_string()));
        }
        params
    }
}

/// Filters for `/v3/lock/listKeyboardPwd`.
#[derive(Debug, Clone)]
pub struct PasscodeListQuery {
    pub lock_id: i64,
    pub page_no: u32,
    pub page_size: u32,
    pub order_by: PasscodeOrder,
    pub search: Option<String>,
}

impl PasscodeListQuery {
    pub fn new(lock_id: i64) -> Self {
        Self {
            lock_id,
            page_no: 1,
            page_size: 20,
            order_by: PasscodeOrder::default(),
            search: None,
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lockId", self.lock_id.to_string()),
            ("pageNo", self.page_no.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("orderBy", self.order_by.as_raw().to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("searchStr", search.to_string()));
        }
        params
    }
}
