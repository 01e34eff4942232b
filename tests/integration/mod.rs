//! Integration tests for the gist enrichment pipeline

mod config_layering;
mod dedup_workflow;
mod enhance_file;
mod pipeline_properties;
mod scheduler_behavior;
mod support;
