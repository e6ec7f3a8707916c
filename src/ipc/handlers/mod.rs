pub mod catalog;
pub mod core;
pub mod desk;
pub mod entries;
pub mod routines;
pub mod setup;
