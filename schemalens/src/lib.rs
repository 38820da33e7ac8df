//! schemalens - map a live relational database catalog into one
//! engine-agnostic schema graph and render it as reports.
//!
//! Engines plug in as [`adapter::Adapter`] implementations; the shared
//! mapping order lives in [`catalog::pipeline`].

pub mod adapter;
pub mod catalog;
pub mod manager;
pub mod model;
pub mod report;
pub mod runner;
