//! JSONL audit trail logging.
//!
//! Each planner run appends events to an audit.jsonl file, one JSON object
//! per line — scoped to planning decisions rather than order fills, since
//! the planner itself never executes trades.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use sentinel_core::{HolisticPlan, PlanResult, RejectedOpportunity, RejectedSequence};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, fixture_path: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({ "fixture": fixture_path }),
    )
}

/// Convenience: log the built context's headline numbers.
pub fn log_context_summary(
    audit: &mut AuditLog,
    security_count: usize,
    position_count: usize,
    total_value_eur: f64,
    available_cash_eur: f64,
) -> Result<()> {
    audit.log(
        "context_built",
        serde_json::json!({
            "securities": security_count,
            "positions": position_count,
            "total_value_eur": total_value_eur,
            "available_cash_eur": available_cash_eur,
        }),
    )
}

/// Convenience: log how many candidates each calculator produced, plus how
/// many were pre-filtered before reaching a candidate.
pub fn log_calculator_output(
    audit: &mut AuditLog,
    candidate_count: usize,
    pre_filtered_count: usize,
) -> Result<()> {
    audit.log(
        "calculators_ran",
        serde_json::json!({
            "candidates": candidate_count,
            "pre_filtered": pre_filtered_count,
        }),
    )
}

/// Convenience: log the selected plan.
pub fn log_plan(audit: &mut AuditLog, plan: &HolisticPlan, portfolio_hash: &str) -> Result<()> {
    audit.log(
        "plan_selected",
        serde_json::json!({
            "portfolio_hash": portfolio_hash,
            "steps": plan.steps.len(),
            "feasible": plan.feasible,
            "current_score": plan.current_score,
            "end_state_score": plan.end_state_score,
            "improvement": plan.improvement,
            "cash_required_eur": plan.cash_required.as_eur(),
            "cash_generated_eur": plan.cash_generated.as_eur(),
        }),
    )
}

/// Convenience: log every rejected opportunity and rejected sequence.
pub fn log_rejections(
    audit: &mut AuditLog,
    rejected_opportunities: &[RejectedOpportunity],
    rejected_sequences: &[RejectedSequence],
) -> Result<()> {
    let opportunities: Vec<_> = rejected_opportunities
        .iter()
        .map(|r| {
            serde_json::json!({
                "isin": r.candidate.isin.as_str(),
                "symbol": r.candidate.symbol,
                "side": format!("{}", r.candidate.side),
                "reason": r.reason,
            })
        })
        .collect();
    let sequences: Vec<_> = rejected_sequences
        .iter()
        .map(|r| {
            serde_json::json!({
                "sequence_hash": r.sequence_hash,
                "end_score": r.end_score,
                "reason": r.reason,
            })
        })
        .collect();

    audit.log(
        "rejections",
        serde_json::json!({ "opportunities": opportunities, "sequences": sequences }),
    )
}

/// Convenience: log full run completion, summarizing the `PlanResult`.
pub fn log_run_completed(audit: &mut AuditLog, result: &PlanResult) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "portfolio_hash": result.portfolio_hash.to_string(),
            "steps": result.plan.steps.len(),
            "rejected_opportunities": result.rejected_opportunities.len(),
            "rejected_sequences": result.rejected_sequences.len(),
        }),
    )
}
