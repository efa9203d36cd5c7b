pub mod chat_api;
pub mod gui;
pub mod markdown;
pub mod widget;
pub mod worker;
