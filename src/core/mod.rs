pub mod aliases;
pub mod catalog;
pub mod config;
pub mod library;
pub mod links;
pub mod matcher;
pub mod pipeline;
pub mod registry;
pub mod similarity;
pub mod synthesizer;
pub mod validator;
