pub mod buffer;
pub mod config;
pub mod derived;
pub mod filter;
pub mod icon;
pub mod mode;
pub mod note;
pub mod store;
pub mod theme;
pub mod tokenizer;
