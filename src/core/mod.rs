// Core module - Session engine and device reset protocols
pub mod reset;
pub mod session;
