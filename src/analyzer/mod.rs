/*!
# Analyzer Module

Document-level driver: configuration plus the engine that chains matching,
classification and active statement tracking for one or many document pairs.
*/

pub mod batch;
pub mod config;
pub mod engine;

pub use batch::{collect_pairs, load_documents, DocumentPaths};
pub use config::AnalyzerConfig;
pub use engine::{
    AnalysisEngine, AnalysisReport, DocumentAnalysis, DocumentInput, DocumentReport, EditSummary, NodeSummary,
};
