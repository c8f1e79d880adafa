pub mod cheating_service;
pub mod directory_service;
pub mod message_service;
pub mod participant_service;
pub mod ranking_service;
pub mod session_service;
