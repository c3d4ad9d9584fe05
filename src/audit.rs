use std::collections::BTreeSet;

use crate::domain::ReportId;

/// Post-hoc completeness check: which source identifiers never made it into
/// the metadata store. A non-empty result is a warning, not a failure.
pub fn missing_identifiers(
    source: &BTreeSet<ReportId>,
    store: &BTreeSet<ReportId>,
) -> BTreeSet<ReportId> {
    source.difference(store).cloned().collect()
}
