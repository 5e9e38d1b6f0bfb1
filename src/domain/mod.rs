pub mod compare;
pub mod error;
pub mod message;
pub mod modify;
pub mod result;
