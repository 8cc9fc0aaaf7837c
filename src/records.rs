//! Pet profiles, health and feeding records.

use std::sync::Arc;

use chrono::NaiveDate;
use log::info;

use crate::error::{Error, Result};
use crate::models::{FoodType, Meal, Pet, Vaccination};
use crate::nutrition::{self, FeedingPlan};
use crate::storage::{keys, Collection, KeyValueStore};

#[derive(Clone)]
pub struct PetRecords {
    store: Arc<dyn KeyValueStore>,
}

impl PetRecords {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn pets(&self) -> Collection<Pet> {
        Collection::new(self.store.clone(), keys::PETS)
    }

    pub fn food_types(&self) -> Collection<FoodType> {
        Collection::new(self.store.clone(), keys::FOOD_TYPES)
    }

    pub fn vaccinations(&self, pet_id: &str) -> Collection<Vaccination> {
        Collection::new(self.store.clone(), keys::vaccinations(pet_id))
    }

    pub fn meals(&self, pet_id: &str) -> Collection<Meal> {
        Collection::new(self.store.clone(), keys::meals(pet_id))
    }

    pub async fn save_pet(&self, pet: Pet) -> Result<Pet> {
        if pet.name.trim().is_empty() {
            return Err(Error::invalid_argument("pet name must not be empty"));
        }
        if !pet.weight_kg.is_finite() || pet.weight_kg < 0.0 {
            return Err(Error::invalid_argument(format!(
                "pet weight must be a non-negative number, got {}",
                pet.weight_kg
            )));
        }
        Ok(self.pets().save(pet).await?)
    }

    /// Removes the pet along with its walks, meals and vaccinations. The pet
    /// record itself is removed last.
    pub async fn delete_pet(&self, pet_id: &str) -> Result<bool> {
        for key in keys::owned_by(pet_id) {
            self.store.remove(&key).await?;
        }
        let removed = self.pets().delete(pet_id).await?;
        if removed {
            info!("Deleted pet {pet_id} and its records");
        }
        Ok(removed)
    }

    pub async fn add_vaccination(&self, vaccination: Vaccination) -> Result<Vaccination> {
        self.require_pet(&vaccination.pet_id).await?;
        let collection = self.vaccinations(&vaccination.pet_id);
        Ok(collection.save(vaccination).await?)
    }

    /// Vaccinations whose next dose is due on or before `date`, soonest first.
    pub async fn vaccinations_due(
        &self,
        pet_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Vaccination>> {
        let mut due: Vec<_> = self
            .vaccinations(pet_id)
            .get_all()
            .await?
            .into_iter()
            .filter(|vaccination| vaccination.is_due_by(date))
            .collect();
        due.sort_by_key(|vaccination| vaccination.next_due_on);
        Ok(due)
    }

    pub async fn add_meal(&self, meal: Meal) -> Result<Meal> {
        self.require_pet(&meal.pet_id).await?;
        if self.food_types().get(&meal.food_type_id).await?.is_none() {
            return Err(Error::invalid_argument(format!(
                "unknown food type {}",
                meal.food_type_id
            )));
        }
        let collection = self.meals(&meal.pet_id);
        Ok(collection.save(meal).await?)
    }

    /// The pet's feeding schedule ordered by time of day.
    pub async fn daily_schedule(&self, pet_id: &str) -> Result<Vec<Meal>> {
        let mut meals = self.meals(pet_id).get_all().await?;
        meals.sort_by_key(|meal| meal.time);
        Ok(meals)
    }

    pub async fn feeding_plan(
        &self,
        pet_id: &str,
        food_type_id: &str,
        meals_per_day: u32,
        today: NaiveDate,
    ) -> Result<FeedingPlan> {
        let pet = self.require_pet(pet_id).await?;
        let food = self
            .food_types()
            .get(food_type_id)
            .await?
            .ok_or_else(|| Error::invalid_argument(format!("unknown food type {food_type_id}")))?;

        nutrition::feeding_plan(&pet, &food, meals_per_day, today)
    }

    async fn require_pet(&self, pet_id: &str) -> Result<Pet> {
        self.pets()
            .get(pet_id)
            .await?
            .ok_or_else(|| Error::invalid_argument(format!("unknown pet {pet_id}")))
    }
}
