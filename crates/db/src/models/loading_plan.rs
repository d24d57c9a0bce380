//! Loading plan payload stored in `orders.loading_instructions`.
//!
//! Trucks are whatever the model wrote and are stored exactly as received.
//! [`TruckPlan`] only offers read accessors over the raw value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;

pub const PLAN_SUMMARY: &str = "Loading plan generated successfully";

pub const PLAN_WARNINGS: [&str; 2] = [
    "Ensure all pallets are properly secured",
    "Verify weight distribution before transport",
];

pub const PLAN_RECOMMENDATIONS: [&str; 2] = [
    "Follow loading sequence as specified",
    "Use appropriate securing equipment",
];

/// One entry of the model's `trucks` array, never reshaped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruckPlan(pub Value);

impl TruckPlan {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `truckNumber` when it is a whole number or a string holding one.
    pub fn truck_number(&self) -> Option<u64> {
        match self.get("truckNumber")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn loading_plan(&self) -> Option<&str> {
        self.get("loadingPlan").and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for TruckPlan {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub trucks: Vec<TruckPlan>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub warnings: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub recommendations: Vec<String>,
}

impl OptimizationResult {
    /// Wrap model-produced trucks with the fixed advisory text.
    pub fn with_advisories(trucks: Vec<TruckPlan>) -> Self {
        Self {
            trucks,
            summary: PLAN_SUMMARY.to_string(),
            warnings: PLAN_WARNINGS.iter().map(|s| s.to_string()).collect(),
            recommendations: PLAN_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
