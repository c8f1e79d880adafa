pub mod room_dto;
pub mod staff_dto;
