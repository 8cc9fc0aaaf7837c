use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::storage::Record;

/// One scheduled feeding in a pet's day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[serde(default)]
    pub id: String,
    pub pet_id: String,
    pub food_type_id: String,
    pub time: NaiveTime,
    pub portion_grams: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Record for Meal {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}
