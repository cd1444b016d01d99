// Discord side of the chat filter: the message hook and the moderator commands.

pub mod chat_filter_handler;
pub mod commands;
