//! Data models for invoices, contracts, forecasts and configuration.

pub mod config;
pub mod contract;
pub mod forecast;
pub mod invoice;
