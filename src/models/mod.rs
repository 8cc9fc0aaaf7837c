pub mod food_type;
pub mod meal;
pub mod pet;
pub mod vaccination;
pub mod walk;

pub use food_type::FoodType;
pub use meal::Meal;
pub use pet::Pet;
pub use vaccination::Vaccination;
pub use walk::{average_speed, Walk};
