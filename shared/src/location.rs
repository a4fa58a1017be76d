//! Courier location types
//!
//! 位置存储是 latest-wins 缓存，不是轨迹日志：每个配送员只保留最新
//! 一条样本。新旧判定是显式的纯函数 [`CourierLocation::is_newer_than`]，
//! 乱序到达的旧样本必须被拒绝，显示位置不允许回退。

use serde::{Deserialize, Serialize};

/// 经纬度坐标
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Courier location sample (GPS ping)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierLocation {
    /// Courier ID
    pub courier_id: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Sample timestamp (Unix milliseconds, set by the reporting device)
    pub timestamp: i64,
    /// GPS accuracy in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Speed in m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Heading in degrees (0-360)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

impl CourierLocation {
    /// 严格新于：时间戳相等视为旧样本（重复投递去重）
    pub fn is_newer_than(&self, other: &CourierLocation) -> bool {
        self.timestamp > other.timestamp
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}
