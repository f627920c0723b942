pub mod cards;
pub mod commands;
pub mod opts;
