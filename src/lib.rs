// Library root
// -----------
// The binary (`main.rs`) only parses arguments and hands off to `cli`.
//
// Module responsibilities:
// - `api`: the `Remote` contract and the blocking HTTP client for Seedr.
// - `models`: wire types returned by the API.
// - `token`: token persistence helpers.
// - `resolve`: figuring out what a bare id refers to and deleting it.
// - `cli` / `ui`: the one-shot commands and the interactive browser.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod resolve;
pub mod token;
pub mod ui;
