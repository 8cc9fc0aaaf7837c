use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    #[serde(default)]
    pub id: String,
    pub pet_id: String,
    pub name: String,
    pub administered_on: NaiveDate,
    #[serde(default)]
    pub next_due_on: Option<NaiveDate>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Vaccination {
    pub fn is_due_by(&self, date: NaiveDate) -> bool {
        self.next_due_on.is_some_and(|due| due <= date)
    }
}

impl Record for Vaccination {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}
