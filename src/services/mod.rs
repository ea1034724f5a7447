pub mod booking;
pub mod conversation;
pub mod intent_parser;
pub mod message_store;
pub mod reply_gate;
pub mod timestamps;
pub mod tools;
