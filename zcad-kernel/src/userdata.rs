use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zcad_core::geometry::Point3;

/// 扩展数据中的单个值，类型由组码决定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum XValue {
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Handle(u64),
    Real(f64),
    Int16(i16),
    Int32(i32),
    Point(Point3),
}

/// 某个应用程序的扩展数据，记录按组码保存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedEntityData {
    pub application_name: String,
    pub data: Vec<(i16, XValue)>,
}

impl ExtendedEntityData {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            data: Vec::new(),
        }
    }

    pub fn push(&mut self, code: i16, value: XValue) {
        self.data.push((code, value));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserValue {
    ExtendedData(ExtendedEntityData),
    Text(String),
    Int16(i16),
    Int32(i32),
    Real(f64),
    Bytes(Vec<u8>),
}

/// 对象上的用户数据，键有序以保证导出顺序稳定。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData(BTreeMap<String, UserValue>);

impl UserData {
    pub fn insert(&mut self, key: impl Into<String>, value: UserValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&UserValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
