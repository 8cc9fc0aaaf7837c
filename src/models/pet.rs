use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::nutrition::{ActivityLevel, HealthCondition, LifeStage};
use crate::storage::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: f64,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub health_condition: HealthCondition,
    /// Overrides the stage derived from `birth_date` when set.
    #[serde(default)]
    pub life_stage: Option<LifeStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    pub fn new(name: impl Into<String>, weight_kg: f64) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            breed: None,
            birth_date: None,
            weight_kg,
            activity_level: ActivityLevel::default(),
            health_condition: HealthCondition::default(),
            life_stage: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whole months between the birth date and `today`.
    pub fn age_months_on(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let mut months = (today.year() - birth.year()) * 12 + today.month() as i32
            - birth.month() as i32;
        if today.day() < birth.day() {
            months -= 1;
        }
        Some(months.max(0) as u32)
    }

    pub fn life_stage_on(&self, today: NaiveDate) -> LifeStage {
        self.life_stage
            .or_else(|| self.age_months_on(today).map(LifeStage::from_age_months))
            .unwrap_or_default()
    }
}

impl Record for Pet {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_months() {
        let mut pet = Pet::new("Rex", 12.0);
        pet.birth_date = Some(date(2025, 3, 15));

        assert_eq!(pet.age_months_on(date(2025, 4, 14)), Some(0));
        assert_eq!(pet.age_months_on(date(2025, 4, 15)), Some(1));
        assert_eq!(pet.age_months_on(date(2026, 3, 15)), Some(12));
        // Birth date in the future clamps to zero.
        assert_eq!(pet.age_months_on(date(2024, 1, 1)), Some(0));
    }

    #[test]
    fn explicit_life_stage_wins() {
        let mut pet = Pet::new("Old Puppy", 8.0);
        pet.birth_date = Some(date(2026, 1, 1));
        assert_eq!(pet.life_stage_on(date(2026, 6, 1)), LifeStage::Puppy);

        pet.life_stage = Some(LifeStage::Senior);
        assert_eq!(pet.life_stage_on(date(2026, 6, 1)), LifeStage::Senior);
    }

    #[test]
    fn unknown_age_defaults_to_adult() {
        let pet = Pet::new("Stray", 20.0);
        assert_eq!(pet.life_stage_on(date(2026, 6, 1)), LifeStage::Adult);
    }
}
