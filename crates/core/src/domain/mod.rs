pub mod label;
pub mod member;
pub mod moderation;
pub mod thread;
