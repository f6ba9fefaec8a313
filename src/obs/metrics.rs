// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"salesforce_fetcher_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counter_labels_match_operation_names() {
		let labels = [OperationKind::Refresh, OperationKind::Revoke, OperationKind::FetchJson]
			.map(OperationKind::as_str);
		let outcomes =
			[OperationOutcome::Attempt, OperationOutcome::Success, OperationOutcome::Failure]
				.map(|outcome| outcome.to_string());

		assert_eq!(labels, ["refresh", "revoke", "fetch_json"]);
		assert_eq!(outcomes, ["attempt", "success", "failure"]);

		record_operation_outcome(OperationKind::Revoke, OperationOutcome::Failure);
	}
}
