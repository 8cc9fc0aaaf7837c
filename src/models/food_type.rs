use serde::{Deserialize, Serialize};

use crate::storage::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodType {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub calories_per_100g: f64,
}

impl Record for FoodType {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}
