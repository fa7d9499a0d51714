/*!
# ENC Analyzer

Incremental syntax-tree diffing and edit classification for applying code
changes to a running program.

Given the old and new syntax trees of a document the analyzer computes a node
correspondence, derives an edit script from it and decides which edits can be
applied live and which are *rude* (require a restart). Statements that are
currently executing are tracked across the edit.

## Pipeline

```text
old tree ─┐
          ├─ matching::compute_top_level_match ─ EditScript ─ classify ─┐
new tree ─┘                                                             │
          per updated member:                                           ├─ diagnostics
          matching::compute_body_match ─ state machine rules ───────────┤
          active statements: active::BodyContext::track ────────────────┘
```

## Architecture

```text
enc-analyzer
├── core        - errors, cancellation, spans
├── ast_core    - arena syntax tree, kinds, modifiers, equivalence, JSON
├── matching    - labels, sequence matcher, tree matcher, edit script
├── classify    - rude edit classification, semantic edits
├── active      - active statements, exception regions, near statements
├── diagnostics - rude edit kinds, spans and display names
├── analyzer    - configuration and the document engine
└── cli_common  - logging and output for the CLI
```

## Usage

```rust,no_run
use enc_analyzer::analyzer::{AnalysisEngine, AnalyzerConfig};
use enc_analyzer::ast_core::json::load_tree;
use enc_analyzer::CancellationToken;
use std::path::Path;

# fn main() -> anyhow::Result<()> {
let old = load_tree(Path::new("old.json"))?;
let new = load_tree(Path::new("new.json"))?;
let engine = AnalysisEngine::new(AnalyzerConfig::default())?;
let analysis = engine.analyze_document(&old, &new, &[], &CancellationToken::new())?;
for diagnostic in &analysis.diagnostics {
    println!("{}", diagnostic.to_diagnostic());
}
# Ok(())
# }
```
*/

pub mod active;
pub mod analyzer;
pub mod ast_core;
pub mod classify;
pub mod cli_common;
pub mod core;
pub mod diagnostics;
pub mod matching;

// Re-export main types for convenience
pub use active::{
    get_exception_region, map_active_statement, ActiveStatement, ActiveStatementFlags, ActiveStatementMapping,
    ExceptionRegion, StatementPart,
};
pub use analyzer::{AnalysisEngine, AnalyzerConfig, DocumentAnalysis};
pub use ast_core::{DeclInfo, Modifiers, NodeId, SyntaxKind, SyntaxTree, TreeBuilder};
pub use classify::{classify, classify_edits, ClassifyOptions, SemanticEdit, SemanticEditKind};
pub use crate::core::{AnalysisError, CancellationToken, ErrorLevel, PackedSpan, Result};
pub use diagnostics::{Diagnostic, RudeEditDiagnostic, RudeEditKind};
pub use matching::{compute_body_match, compute_top_level_match, Edit, EditKind, EditScript, Match, MatchOptions};
