//! MediConnect storage crate - SQLite persistence for the doctor directory.
//!
//! Provides a WAL-mode SQLite database with migrations and the doctor
//! repository behind the [`DoctorStore`] capability trait.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{DoctorRepository, DoctorStore};
