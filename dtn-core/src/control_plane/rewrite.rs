//! Rewriting of the `api:me` pseudo-identifier into the node's real identifier.

use crate::bundle::Bundle;
use crate::eid::{Eid, EidError, EidFactory};

fn rewrite_one(
    eid: &Eid,
    local_eid: &Eid,
    factory: &dyn EidFactory,
) -> Result<Option<Eid>, EidError> {
    match eid.api_path() {
        Some(path) => factory
            .create(&format!("{}{}", local_eid.as_str(), path))
            .map(Some),
        None => Ok(None),
    }
}

/// Replaces `api:me[/path]` in source, report-to and destination by
/// `<local_eid>[/path]`.
///
/// All three rewrites are computed before any field is assigned, so on error the
/// bundle is left exactly as it was.
pub(crate) fn rewrite_api_me(
    bundle: &mut Bundle,
    local_eid: &Eid,
    factory: &dyn EidFactory,
) -> Result<(), EidError> {
    let source = rewrite_one(&bundle.source, local_eid, factory)?;
    let report_to = rewrite_one(&bundle.report_to, local_eid, factory)?;
    let destination = rewrite_one(&bundle.destination, local_eid, factory)?;

    if let Some(source) = source {
        bundle.source = source;
    }
    if let Some(report_to) = report_to {
        bundle.report_to = report_to;
    }
    if let Some(destination) = destination {
        bundle.destination = destination;
    }
    Ok(())
}
