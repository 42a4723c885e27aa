//! Human-readable rendering of a `PlanResult` for the terminal: a
//! numbered step list followed by cash and rejection summaries.

use sentinel_core::PlanResult;

pub fn print_plan(result: &PlanResult) {
    println!("Portfolio hash: {}", result.portfolio_hash);
    println!(
        "Score: {:.4} -> {:.4} (improvement {:+.4})",
        result.plan.current_score, result.plan.end_state_score, result.plan.improvement
    );
    println!("{}", result.plan.narrative_summary);
    println!();

    if result.plan.steps.is_empty() {
        println!("No actions recommended.");
    } else {
        println!("Plan:");
        for step in &result.plan.steps {
            println!(
                "  {}. {} {} {} @ {} = {} — {}",
                step.step_number,
                step.side,
                step.quantity,
                step.symbol,
                step.estimated_price,
                step.estimated_value,
                step.reason
            );
        }
        println!();
        println!(
            "Cash required: {}   Cash generated: {}",
            result.plan.cash_required, result.plan.cash_generated
        );
    }

    if !result.plan.feasible {
        println!();
        println!("WARNING: plan is marked infeasible (fallback sequence or enforcer rejection).");
    }

    if !result.rejected_opportunities.is_empty() {
        println!();
        println!(
            "Rejected opportunities ({}):",
            result.rejected_opportunities.len()
        );
        for rejected in &result.rejected_opportunities {
            println!(
                "  {} {} — {}",
                rejected.candidate.side, rejected.candidate.symbol, rejected.reason
            );
        }
    }

    if !result.rejected_sequences.is_empty() {
        println!();
        println!(
            "Rejected sequences ({}):",
            result.rejected_sequences.len()
        );
        for rejected in &result.rejected_sequences {
            println!(
                "  {} (score {:.4}) — {}",
                &rejected.sequence_hash[..8.min(rejected.sequence_hash.len())],
                rejected.end_score,
                rejected.reason
            );
        }
    }
}
