pub mod models;
pub mod run;
pub mod tags;
