// Library for tests to access modules

pub mod catalog;
pub mod chunk;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod rollup;
pub mod store;
pub mod tier;
pub mod writer;
