use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::PredictError;

pub const FEATURE_COUNT: usize = 20;

// Canonical field order; the classifier expects vectors in exactly this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "battery_power",
    "blue",
    "clock_speed",
    "dual_sim",
    "fc",
    "four_g",
    "int_memory",
    "m_dep",
    "mobile_wt",
    "n_cores",
    "pc",
    "px_height",
    "px_width",
    "ram",
    "sc_h",
    "sc_w",
    "talk_time",
    "three_g",
    "touch_screen",
    "wifi",
];

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MobileFeatures {
    pub battery_power: f64,
    pub blue: f64,
    pub clock_speed: f64,
    pub dual_sim: f64,
    pub fc: f64,
    pub four_g: f64,
    pub int_memory: f64,
    pub m_dep: f64,
    pub mobile_wt: f64,
    pub n_cores: f64,
    pub pc: f64,
    pub px_height: f64,
    pub px_width: f64,
    pub ram: f64,
    pub sc_h: f64,
    pub sc_w: f64,
    pub talk_time: f64,
    pub three_g: f64,
    pub touch_screen: f64,
    pub wifi: f64,
}

impl MobileFeatures {
    pub fn from_map(item: &Map<String, Value>) -> Result<Self, PredictError> {
        serde_json::from_value(Value::Object(item.clone()))
            .map_err(|error| PredictError::Inference(error.to_string()))
    }

    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.battery_power,
            self.blue,
            self.clock_speed,
            self.dual_sim,
            self.fc,
            self.four_g,
            self.int_memory,
            self.m_dep,
            self.mobile_wt,
            self.n_cores,
            self.pc,
            self.px_height,
            self.px_width,
            self.ram,
            self.sc_h,
            self.sc_w,
            self.talk_time,
            self.three_g,
            self.touch_screen,
            self.wifi,
        ]
    }
}
