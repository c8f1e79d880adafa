pub mod health;
pub mod room;
pub mod staff;
