//! Toxgate Core - Toxicity classification and model provisioning.
//!
//! This crate provides the classification domain logic for the Toxgate
//! chat toxicity service: the classifier boundary trait, the toxic-bert
//! ONNX classifier behind it, score extraction, and first-run download
//! of the model files and ONNX Runtime.

pub mod classifier;
pub mod model_downloader;
