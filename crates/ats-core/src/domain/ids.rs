//! Domain identifiers (strongly-typed IDs).
//!
//! サーバーが採番する数値 ID を Phantom type パターンで型付けします。
//! `JobId` と `ApplicationId` は同じ `i64` を包みますが、コンパイル時に混同できません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::num::ParseIntError;
use std::str::FromStr;

/// IdMarker は各 ID 型のマーカー trait
///
/// エラーメッセージやログで使う名前（"job", "application"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn name() -> &'static str;
}

/// ジェネリック ID 型
///
/// JSON 上は素の数値として扱います（`#[serde(transparent)]`）。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: i64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    /// "job 12" のような人間向けの表記
    pub fn describe(&self) -> String {
        format!("{} {}", T::name(), self.value)
    }
}

impl<T: IdMarker> From<i64> for Id<T> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn name() -> &'static str {
        "job"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Application {}

impl IdMarker for Application {
    fn name() -> &'static str {
        "application"
    }
}

/// Identifier of a job posting.
pub type JobId = Id<Job>;

/// Identifier of a candidate application.
pub type ApplicationId = Id<Application>;
