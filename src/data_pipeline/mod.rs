// src/data_pipeline/mod.rs

pub mod signature_source;

pub use signature_source::{
    collect_new_signatures, CollectedSignatures, RpcSignatureSource, SignaturePage, SignatureSource,
};
