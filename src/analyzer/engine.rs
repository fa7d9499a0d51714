/*!
# Analysis Engine

Runs the whole pipeline for one document pair: top-level match, edit script,
edit classification, body matches of updated members, suspension point rules
and active statement tracking. Batches of documents are analysed in parallel
on a dedicated rayon pool.
*/

use super::config::AnalyzerConfig;
use crate::active::{ActiveStatement, ActiveStatementMapping, BodyContext, StatementPart};
use crate::ast_core::body::{body_match_root, containing_member};
use crate::ast_core::json::ActiveStatementSpec;
use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::classify::{classify, report_state_machine_edits, SemanticEdit};
use crate::core::cancel::CancellationToken;
use crate::core::errors::Result;
use crate::core::position::PackedSpan;
use crate::diagnostics::{deleted_node_span, diagnostic_span, Diagnostic, NodeRef, RudeEditDiagnostic, RudeEditKind};
use crate::matching::{compute_body_match, compute_top_level_match, Edit, EditKind, EditScript, Match, MatchOptions};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// Сопоставление тела члена и его скрипт.
struct BodyDiff {
    body_match: Match,
    script: EditScript,
}

/// Полный результат анализа одной пары деревьев.
pub struct DocumentAnalysis {
    pub top_match: Match,
    pub script: EditScript,
    pub diagnostics: Vec<RudeEditDiagnostic>,
    pub semantic_edits: Vec<SemanticEdit>,
    pub active_statements: Vec<ActiveStatementMapping>,
}

impl DocumentAnalysis {
    pub fn has_rude_edits(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn report(&self, old: &SyntaxTree, new: &SyntaxTree) -> AnalysisReport {
        AnalysisReport {
            edits: self.script.edits().iter().map(|e| EditSummary::describe(old, new, e)).collect(),
            diagnostics: self.diagnostics.iter().map(RudeEditDiagnostic::to_diagnostic).collect(),
            semantic_edits: self.semantic_edits.clone(),
            active_statements: self.active_statements.clone(),
        }
    }
}

/// Сериализуемый отчёт для CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub edits: Vec<EditSummary>,
    pub diagnostics: Vec<Diagnostic>,
    pub semantic_edits: Vec<SemanticEdit>,
    pub active_statements: Vec<ActiveStatementMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: SyntaxKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub span: PackedSpan,
}

impl NodeSummary {
    fn describe(tree: &SyntaxTree, id: NodeId) -> Self {
        Self {
            id,
            kind: tree.kind(id),
            name: tree.name(id).or_else(|| tree.text(id)).map(str::to_string),
            span: tree.span(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditSummary {
    pub kind: EditKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<NodeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<NodeSummary>,
}

impl EditSummary {
    pub fn describe(old: &SyntaxTree, new: &SyntaxTree, edit: &Edit) -> Self {
        Self {
            kind: edit.kind(),
            old: edit.old().map(|o| NodeSummary::describe(old, o)),
            new: edit.new().map(|n| NodeSummary::describe(new, n)),
        }
    }
}

/// Одна пара документов для пакетного анализа.
#[derive(Debug)]
pub struct DocumentInput {
    pub name: String,
    pub old: SyntaxTree,
    pub new: SyntaxTree,
    pub active: Vec<ActiveStatementSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub name: String,
    #[serde(flatten)]
    pub report: AnalysisReport,
}

pub struct AnalysisEngine {
    /// Настройки сопоставления и классификации
    config: AnalyzerConfig,
    /// Пул потоков для пакетного анализа
    pool: rayon::ThreadPool,
}

impl AnalysisEngine {
    /// Создает движок с собственным пулом потоков
    pub fn new(config: AnalyzerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let workers = config.effective_workers();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
        tracing::info!("Configured {} worker threads for parallel analysis", workers);
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Анализирует пару деревьев; активные инструкции задаются смещениями в старом дереве.
    pub fn analyze_document(
        &self,
        old: &SyntaxTree,
        new: &SyntaxTree,
        active: &[ActiveStatementSpec],
        cancel: &CancellationToken,
    ) -> Result<DocumentAnalysis> {
        let statements = active.iter().map(|spec| ActiveStatement::resolve(old, spec)).collect::<Result<Vec<_>>>()?;
        self.analyze_with_statements(old, new, &statements, cancel)
    }

    pub fn analyze_with_statements(
        &self,
        old: &SyntaxTree,
        new: &SyntaxTree,
        active: &[ActiveStatement],
        cancel: &CancellationToken,
    ) -> Result<DocumentAnalysis> {
        let options = self.config.match_options();
        let top_match = compute_top_level_match(old, new, &options, cancel)?;
        let script = EditScript::compute(old, new, &top_match, &options);
        tracing::debug!("top-level match: {} pairs, {} edits", top_match.len(), script.len());

        let classification = classify(old, new, &top_match, &script, &self.config.classify_options(), cancel)?;
        let mut diagnostics = classification.diagnostics;

        let mut bodies = BodyCache { old, new, options: &options, cancel, diffs: HashMap::new() };
        for edit in script.edits() {
            let Edit::Update(o, n) = *edit else { continue };
            if let Some(diff) = bodies.get(o, n)? {
                report_state_machine_edits(old, new, &diff.body_match, &mut diagnostics);
            }
        }

        let mut active_statements = Vec::with_capacity(active.len());
        for statement in active {
            cancel.check()?;
            let mapping = track_active_statement(&mut bodies, &top_match, &script, statement, &mut diagnostics)?;
            active_statements.push(mapping);
        }

        diagnostics.sort_by_key(|d| d.span.start);
        if !diagnostics.is_empty() {
            tracing::info!("{} rude edits found", diagnostics.len());
        }
        Ok(DocumentAnalysis {
            top_match,
            script,
            diagnostics,
            semantic_edits: classification.semantic_edits,
            active_statements,
        })
    }

    /// Анализирует документы параллельно; первая ошибка прерывает пакет.
    pub fn analyze_documents(&self, documents: &[DocumentInput], cancel: &CancellationToken) -> Result<Vec<DocumentReport>> {
        tracing::info!("Analyzing {} documents using {} workers", documents.len(), self.worker_count());
        let reports = self.pool.install(|| {
            documents
                .par_iter()
                .map(|doc| {
                    let analysis = self.analyze_document(&doc.old, &doc.new, &doc.active, cancel)?;
                    Ok(DocumentReport { name: doc.name.clone(), report: analysis.report(&doc.old, &doc.new) })
                })
                .collect::<Result<Vec<_>>>()
        })?;
        tracing::info!("Parallel analysis completed: {} documents processed", reports.len());
        Ok(reports)
    }
}

/// Кэш сопоставлений тел по паре членов.
struct BodyCache<'a> {
    old: &'a SyntaxTree,
    new: &'a SyntaxTree,
    options: &'a MatchOptions,
    cancel: &'a CancellationToken,
    diffs: HashMap<(NodeId, NodeId), BodyDiff>,
}

impl BodyCache<'_> {
    /// `None`, если у одного из членов нет тела.
    fn get(&mut self, old_member: NodeId, new_member: NodeId) -> Result<Option<&BodyDiff>> {
        let (Some(old_root), Some(new_root)) = (body_match_root(self.old, old_member), body_match_root(self.new, new_member))
        else {
            return Ok(None);
        };
        let key = (old_member, new_member);
        if !self.diffs.contains_key(&key) {
            let body_match = compute_body_match(self.old, old_root, self.new, new_root, self.options, self.cancel)?;
            let script = EditScript::compute(self.old, self.new, &body_match, self.options);
            self.diffs.insert(key, BodyDiff { body_match, script });
        }
        Ok(self.diffs.get(&key))
    }
}

fn track_active_statement(
    bodies: &mut BodyCache<'_>,
    top_match: &Match,
    script: &EditScript,
    active: &ActiveStatement,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) -> Result<ActiveStatementMapping> {
    let (old, new) = (bodies.old, bodies.new);
    let statement = active.statement;
    let Some(old_member) = containing_member(old, statement) else {
        return Err(crate::core::errors::AnalysisError::UnknownActiveStatement(old.span(statement).start));
    };

    let Some(new_member) = top_match.new_partner(old_member).or_else(|| script.moved_partner(old_member)) else {
        tracing::debug!("member of active statement {:?} deleted", statement);
        let span = deleted_node_span(old, new, top_match, old_member);
        return Ok(deleted_statement(old, active, span, diagnostics));
    };

    match bodies.get(old_member, new_member)? {
        Some(diff) => {
            let context = BodyContext { old, new, body_match: &diff.body_match, script: &diff.script };
            Ok(context.track(active, diagnostics))
        }
        None => {
            let span = diagnostic_span(new, new_member, EditKind::Update);
            Ok(deleted_statement(old, active, span, diagnostics))
        }
    }
}

/// Инструкция, для которой нет тела-партнёра, всегда считается удалённой.
fn deleted_statement(
    old: &SyntaxTree,
    active: &ActiveStatement,
    new_span: PackedSpan,
    diagnostics: &mut Vec<RudeEditDiagnostic>,
) -> ActiveStatementMapping {
    diagnostics.push(RudeEditDiagnostic::new(
        RudeEditKind::DeleteActiveStatement,
        new_span,
        NodeRef::old(active.statement),
        Vec::new(),
    ));
    ActiveStatementMapping {
        old_statement: active.statement,
        old_part: active.part,
        old_span: crate::active::active_span(old, active.statement, active.part),
        new_statement: None,
        new_part: StatementPart::None,
        new_span,
        old_regions: Vec::new(),
        new_regions: Vec::new(),
    }
}
