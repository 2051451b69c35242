pub mod data_controller;
pub mod session_controller;
