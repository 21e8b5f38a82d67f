// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par le binaire (pool_listener.rs).
pub mod communication;
pub mod config;
pub mod data_pipeline;
pub mod decoders;
pub mod error;
pub mod filtering;
pub mod monitoring;
pub mod rpc;
pub mod watcher;

#[cfg(test)]
mod test_utils;
