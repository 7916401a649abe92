pub mod chat;
pub mod desktop;
pub mod voice;
