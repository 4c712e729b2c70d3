// src/lib.rs
pub mod api;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod insights;
pub mod market;
pub mod models;
pub mod service;
pub mod trade;
pub mod valuation;
