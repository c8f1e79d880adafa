pub mod assignment;
pub mod cheating_event;
pub mod message;
pub mod participant;
pub mod session;
