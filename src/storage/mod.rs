//! Storage module - persisted collections and their repositories

mod db;
mod repos;

pub use db::*;
pub use repos::*;
