// This crate centralizes the shapes exchanged between the widget and the chat proxy.

pub mod chat_request; // Widget <-> proxy request/response bodies
