pub mod annotations;
pub mod health;
pub mod monitor;
pub mod traces;
