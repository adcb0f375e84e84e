//! Daily Poem - a poem of the day written from the news
//!
//! Headlines from a set of RSS feeds are mined for recurring topics, which are
//! scored, ranked and sorted into categories. The best keywords seed a short
//! French poem that is stored once per day and served over HTTP.

pub mod calendar;
pub mod candidates;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod pipeline;
pub mod poem;
pub mod routes;
pub mod topics;
pub mod vocabulary;
pub mod writer;
