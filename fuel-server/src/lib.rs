//! Fuel price finder server.
//!
//! A JSON API that answers: "Where is the cheapest fuel near me?"
//! Station and price data live in a managed backend; this server adds
//! great-circle proximity search, caching and community reporting on top.

pub mod backend;
pub mod cache;
pub mod config;
pub mod domain;
pub mod geo;
pub mod listing;
pub mod stations;
pub mod web;
