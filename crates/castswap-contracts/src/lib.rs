pub mod aspect;
pub mod chat;
pub mod events;
pub mod failures;
pub mod images;
pub mod session;
