use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::classify::classify_amounts;
use crate::config::{ReconConfig, OUTPUT_RECONCILED, OUTPUT_REPORT, OUTPUT_UNRECONCILED};
use crate::error::ReconError;
use crate::matcher::{duplicate_target_keys, match_by_key};
use crate::model::{Record, RecordSet, ReconMeta, ReconMode, ReconResult};
use crate::report::build_rule_report;
use crate::summary::{add_amount_split, add_report, summarize_match};

/// Run reconciliation per config on pre-loaded records.
///
/// The config is validated first; data-quality problems inside records never
/// fail the run.
pub fn run(config: &ReconConfig, source: &[Record], target: &[Record]) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let source_key = config.source.key.as_str();
    let target_key = config.target.key.as_str();

    let duplicates = duplicate_target_keys(target, target_key);
    if !duplicates.is_empty() {
        warn!(
            count = duplicates.len(),
            key = target_key,
            "duplicate target keys; only the first occurrence of each can match"
        );
        for (key, index) in &duplicates {
            debug!(%key, index, "stranded target row");
        }
    }

    let matches = match_by_key(source, target, source_key, target_key);
    debug!(
        matched = matches.matched_pairs.len(),
        unmatched_source = matches.unmatched_source.len(),
        unmatched_target = matches.unmatched_target.len(),
        "key match complete"
    );

    let mut summary = summarize_match(source.len(), target.len(), &matches, duplicates.len());
    let mut outputs: BTreeMap<String, RecordSet> = BTreeMap::new();

    match (config.mode(), &config.amount) {
        (ReconMode::Amount, Some(amount)) => {
            let split = classify_amounts(
                &matches,
                &amount.field,
                amount.target_field.as_deref(),
                &amount.tolerance,
            );
            add_amount_split(&mut summary, &split);
            debug!(
                reconciled = split.reconciled.len(),
                unreconciled = split.unreconciled.len(),
                invalid_numeric = split.invalid_numeric,
                tolerance = %amount.tolerance,
                "amount classification complete"
            );
            outputs.insert(OUTPUT_RECONCILED.into(), split.reconciled);
            outputs.insert(OUTPUT_UNRECONCILED.into(), split.unreconciled);
        }
        _ => {
            let report = build_rule_report(&matches, &config.rules, source_key, target_key, &config.report);
            add_report(&mut summary, &report);
            debug!(rules = config.rules.len(), rows = report.len(), "rule report complete");
            outputs.insert(OUTPUT_REPORT.into(), report);
        }
    }

    for projection in &config.projections {
        // validate() guarantees `from` names an output of this mode
        let rows = outputs
            .get(&projection.from)
            .map(|rows| projection.apply(rows))
            .unwrap_or_default();
        debug!(name = %projection.name, from = %projection.from, rows = rows.len(), "projection");
        outputs.insert(projection.name.clone(), rows);
    }

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            mode: config.mode(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        outputs,
    })
}
