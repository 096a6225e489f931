pub mod batch;
pub mod config;
pub mod error;
pub mod extremities;
pub mod feed;
pub mod fetch;
pub mod geometry;
pub mod itinerary;
pub mod line;
pub mod model;
pub mod output;
pub mod stats;
pub mod store;
pub mod unify;
