mod database;
mod server;
mod token;

pub use database::{migrate, reset};
pub use server::serve;
pub use token::token;
