//! Display reports: serialize a codex summary for humans or dashboards.
//!
//! ```text
//! Codex → CodexReport::build() → write_json_report()  → JSON document
//!                              → write_text_report()  → one line per node/edge
//! ```
//!
//! Reports are read-only views. Tags show up here and nowhere else in
//! scoring.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::governance::{GovernanceAnalytics, GovernanceEngine};
use crate::graph::{FractalGraph, FractalPattern, GraphStats};
use crate::model::*;
use crate::registry::AxisRegistry;
use crate::resonance::pairwise;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSummary {
    pub id: AxisId,
    pub name: String,
    pub polarity: String,
    pub placed_nodes: usize,
    pub coherence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub layer: ScaleLayer,
    pub contribution: f64,
    pub consonance: Option<f64>,
    pub patterns: Vec<FractalPattern>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub key: FieldKey,
    pub pattern: FieldPattern,
    pub aggregate: f64,
    pub participants: usize,
    pub stale: bool,
}

/// Point-in-time summary of a codex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexReport {
    pub generated_at: DateTime<Utc>,
    pub axes: Vec<AxisSummary>,
    pub graph: GraphStats,
    pub governance: GovernanceAnalytics,
    pub nodes: Vec<NodeSummary>,
    pub fields: Vec<FieldSummary>,
}

impl CodexReport {
    pub fn build(registry: &AxisRegistry, graph: &FractalGraph, engine: &GovernanceEngine) -> Result<Self> {
        let calculator = engine.calculator();
        let axes = registry
            .axes()
            .map(|axis| AxisSummary {
                id: axis.id.clone(),
                name: axis.name.clone(),
                polarity: axis.polarity.to_string(),
                placed_nodes: graph.nodes().filter(|n| n.axis_values.contains_key(&axis.id)).count(),
                coherence: calculator.axis_coherence(graph, &axis.id),
            })
            .collect();

        let mut nodes = Vec::with_capacity(graph.node_count());
        for id in graph.node_ids() {
            let node = graph.get_node(&id)?;
            nodes.push(NodeSummary {
                id: id.clone(),
                name: node.name.clone(),
                layer: node.layer,
                contribution: node.contribution,
                consonance: registry.profile_consonance(&node.axis_values),
                patterns: graph.fractal_patterns(&id)?,
                tags: node.tags.clone(),
            });
        }

        let current = graph.revision();
        let fields = engine
            .fields()
            .map(|f| FieldSummary {
                key: f.key(),
                pattern: f.pattern,
                aggregate: f.aggregate,
                participants: f.participants.len(),
                stale: f.revision < current,
            })
            .collect();

        Ok(Self {
            generated_at: Utc::now(),
            axes,
            graph: graph.statistics(),
            governance: engine.analytics(),
            nodes,
            fields,
        })
    }
}

/// Write the report as pretty-printed JSON.
pub fn write_json_report(report: &CodexReport, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Write a plain-text listing: header, one line per node, one per edge. Edges
/// carry the relationship class of their endpoints when it is defined.
pub fn write_text_report(report: &CodexReport, graph: &FractalGraph, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "// fractal-codex report")?;
    writeln!(writer, "// Nodes: {}", report.graph.node_count)?;
    writeln!(writer, "// Edges: {} ({} cross-layer)", report.graph.edge_count, report.graph.cross_layer_edges)?;
    writeln!(writer, "// Decisions: {}", report.governance.decisions)?;
    writeln!(writer)?;

    for axis in &report.axes {
        writeln!(
            writer,
            "axis {} [{}] placed={} coherence={:.3}",
            axis.id, axis.polarity, axis.placed_nodes, axis.coherence
        )?;
    }
    writeln!(writer)?;

    for node in &report.nodes {
        let consonance = node.consonance.map_or_else(|| "-".to_string(), |c| format!("{c:.3}"));
        let tags = format_tags(&node.tags);
        writeln!(
            writer,
            "[{}] {} \"{}\" w={:.3} consonance={}{}",
            node.layer,
            node.id,
            node.name,
            node.contribution,
            consonance,
            if tags.is_empty() { String::new() } else { format!(" {{{tags}}}") }
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "// Relationships")?;
    for edge in graph.relationships() {
        let relationship = pairwise(graph.get_node(&edge.parent)?, graph.get_node(&edge.child)?).relationship();
        writeln!(
            writer,
            "{} -> {} ({:.3}){}{}",
            edge.parent,
            edge.child,
            edge.weight,
            relationship.map_or_else(String::new, |r| format!(" {r}")),
            if edge.cross_layer { " cross-layer" } else { "" }
        )?;
    }

    if !report.fields.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "// Fields")?;
        for field in &report.fields {
            writeln!(
                writer,
                "{} {} aggregate={:.3} participants={}{}",
                field.key,
                field.pattern,
                field.aggregate,
                field.participants,
                if field.stale { " (stale)" } else { "" }
            )?;
        }
    }
    Ok(())
}

/// Tags as `key: value, ...`, values in their display form.
fn format_tags(tags: &Tags) -> String {
    tags.iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
