pub mod appstate;
pub mod config;
pub mod database;
pub mod discordclient;
pub mod evaluator;
pub mod eventrouter;
pub mod notifier;
