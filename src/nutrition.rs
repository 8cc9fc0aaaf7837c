//! Daily energy requirement and portion sizing.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{FoodType, Pet};

const PUPPY_UNTIL_MONTHS: u32 = 12;
const SENIOR_FROM_MONTHS: u32 = 84;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ActivityLevel {
    pub fn coefficient(self) -> f64 {
        match self {
            ActivityLevel::Low => 1.2,
            ActivityLevel::Medium => 1.4,
            ActivityLevel::High => 1.6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Low => "low",
            ActivityLevel::Medium => "medium",
            ActivityLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthCondition {
    #[default]
    Healthy,
    Overweight,
    Underweight,
}

impl HealthCondition {
    pub fn coefficient(self) -> f64 {
        match self {
            HealthCondition::Healthy => 1.0,
            HealthCondition::Overweight => 0.8,
            HealthCondition::Underweight => 1.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthCondition::Healthy => "healthy",
            HealthCondition::Overweight => "overweight",
            HealthCondition::Underweight => "underweight",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifeStage {
    Puppy,
    #[default]
    Adult,
    Senior,
}

impl LifeStage {
    pub fn coefficient(self) -> f64 {
        match self {
            LifeStage::Puppy => 2.0,
            LifeStage::Adult => 1.0,
            LifeStage::Senior => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifeStage::Puppy => "puppy",
            LifeStage::Adult => "adult",
            LifeStage::Senior => "senior",
        }
    }

    pub fn from_age_months(months: u32) -> Self {
        if months < PUPPY_UNTIL_MONTHS {
            LifeStage::Puppy
        } else if months >= SENIOR_FROM_MONTHS {
            LifeStage::Senior
        } else {
            LifeStage::Adult
        }
    }
}

macro_rules! impl_text {
    ($ty:ty, [$($variant:expr),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(value: &str) -> Result<Self> {
                let wanted = value.trim().to_ascii_lowercase();
                [$($variant),+]
                    .into_iter()
                    .find(|candidate: &$ty| candidate.as_str() == wanted)
                    .ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "unknown {} '{value}'",
                            stringify!($ty)
                        ))
                    })
            }
        }
    };
}

impl_text!(ActivityLevel, [ActivityLevel::Low, ActivityLevel::Medium, ActivityLevel::High]);
impl_text!(
    HealthCondition,
    [HealthCondition::Healthy, HealthCondition::Overweight, HealthCondition::Underweight]
);
impl_text!(LifeStage, [LifeStage::Puppy, LifeStage::Adult, LifeStage::Senior]);

/// Daily energy requirement in kcal: `(30 * kg + 70)` scaled by the three
/// coefficient tables and rounded.
pub fn daily_calories(
    weight_kg: f64,
    activity: ActivityLevel,
    health: HealthCondition,
    life_stage: LifeStage,
) -> Result<u32> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(Error::invalid_argument(format!(
            "weight must be a non-negative number of kilograms, got {weight_kg}"
        )));
    }

    let base = 30.0 * weight_kg + 70.0;
    let calories =
        base * activity.coefficient() * health.coefficient() * life_stage.coefficient();

    Ok(calories.round() as u32)
}

/// Grams per meal for a daily calorie target.
pub fn portion_size(
    daily_calories: u32,
    calories_per_100g: f64,
    meals_per_day: u32,
) -> Result<u32> {
    if !calories_per_100g.is_finite() || calories_per_100g <= 0.0 {
        return Err(Error::invalid_argument(format!(
            "calories per 100g must be positive, got {calories_per_100g}"
        )));
    }
    if meals_per_day == 0 {
        return Err(Error::invalid_argument("meals per day must be at least 1"));
    }

    let grams_per_day = f64::from(daily_calories) / calories_per_100g * 100.0;
    Ok((grams_per_day / f64::from(meals_per_day)).round() as u32)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedingPlan {
    pub daily_calories: u32,
    pub grams_per_day: u32,
    pub grams_per_meal: u32,
    pub meals_per_day: u32,
    pub life_stage: LifeStage,
}

/// Combines a pet profile and a food into a portion plan. The pet's
/// explicit life stage wins over the one derived from its birth date.
pub fn feeding_plan(
    pet: &Pet,
    food: &FoodType,
    meals_per_day: u32,
    today: NaiveDate,
) -> Result<FeedingPlan> {
    let life_stage = pet.life_stage_on(today);
    let daily = daily_calories(
        pet.weight_kg,
        pet.activity_level,
        pet.health_condition,
        life_stage,
    )?;

    Ok(FeedingPlan {
        daily_calories: daily,
        grams_per_day: portion_size(daily, food.calories_per_100g, 1)?,
        grams_per_meal: portion_size(daily, food.calories_per_100g, meals_per_day)?,
        meals_per_day,
        life_stage,
    })
}
