pub mod components;
pub mod health;
pub mod marketplace;
pub mod usage;
