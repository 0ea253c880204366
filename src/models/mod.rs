//! Data models for task-board entities

mod board;
mod card;
mod user;

pub use board::*;
pub use card::*;
pub use user::*;
