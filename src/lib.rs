// src/lib.rs

//! YTS watcher library

pub mod error;
pub mod models;
pub mod notifiers;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
