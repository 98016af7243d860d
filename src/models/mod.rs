pub mod item;
pub mod token;
pub mod vehicle;
