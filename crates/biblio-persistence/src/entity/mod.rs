//! `SeaORM` entities for the lending schema

pub mod prelude;

pub mod book;
pub mod borrowing;
pub mod user;
