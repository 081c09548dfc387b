//! Identity resolution: docked rows → canonical compound ids.
//!
//! Docking output only carries a free-text molecule name such as
//! `"4239273_3"` or `"CHEMBL4239273 pose 3"`. The compound id is the first
//! contiguous run of digits in that name. A row is kept only when that id is
//! listed in the canonical SMILES reference *under the same activity label*,
//! which filters out stale or mislabeled docking output.
//!
//! Neither failure is an error: rows without a digit run are counted as
//! malformed, rows whose id is not listed are counted as unmatched, and both
//! are dropped.
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;

use crate::records::{CanonicalTable, CompoundRecord, DockedTable};

fn digit_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static pattern is valid"))
}

/// Extract the first run of ASCII digits in `name` as a compound id.
///
/// Returns `None` when there is no digit run or it does not fit in a `u64`.
///
/// ```
/// use cyp_dock_ml::identity::extract_compound_id;
///
/// assert_eq!(extract_compound_id("4239273_2"), Some(4239273));
/// assert_eq!(extract_compound_id("lig-0042b_7"), Some(42));
/// assert_eq!(extract_compound_id("no digits"), None);
/// ```
pub fn extract_compound_id(name: &str) -> Option<u64> {
    digit_run()
        .find(name)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Row counts before and after resolution of one docked table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Rows read.
    pub before: usize,
    /// Rows kept.
    pub after: usize,
    /// Rows whose name held no usable digit run.
    pub malformed: usize,
    /// Rows whose id is not in the canonical list for their label.
    pub unmatched: usize,
}

/// Resolve a docked table against the canonical reference.
///
/// Output ids are always a subset of the canonical ids carrying the table's
/// activity label; input row order is preserved.
pub fn resolve(table: DockedTable, canonical: &CanonicalTable) -> (Vec<CompoundRecord>, ResolveReport) {
    let mut report = ResolveReport {
        before: table.rows.len(),
        ..Default::default()
    };
    let activity = table.activity;

    let mut kept = Vec::with_capacity(table.rows.len());
    for raw in table.rows {
        let Some(id) = extract_compound_id(&raw.name) else {
            debug!("no compound id in molecule name '{}'", raw.name);
            report.malformed += 1;
            continue;
        };
        if !canonical.contains(id, activity) {
            report.unmatched += 1;
            continue;
        }
        kept.push(CompoundRecord {
            compound_id: id,
            name: raw.name,
            activity,
            rank_score: raw.rank_score,
            match_score: raw.match_score,
            features: raw.features,
        });
    }
    report.after = kept.len();

    info!(
        "{:?}: {} rows -> {} ({} malformed names, {} unmatched ids)",
        activity, report.before, report.after, report.malformed, report.unmatched
    );
    (kept, report)
}
