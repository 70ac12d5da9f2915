mod command;
mod date;
pub mod mealplan;

pub use command::*;
pub use date::*;
