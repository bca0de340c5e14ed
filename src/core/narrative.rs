use crate::domain::model::{AssessedStartup, BatchEntry};
use crate::domain::ports::NarrativeService;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Requests commentary for every successfully assessed entry, at most
/// `concurrency` calls in flight. Results stay in input order.
///
/// A failed call only sets `narrative_error`; the numeric report is kept.
pub async fn annotate(
    entries: Vec<BatchEntry>,
    service: Arc<dyn NarrativeService>,
    concurrency: usize,
) -> Vec<AssessedStartup> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        let (Some(input), Ok(report)) = (entry.input, &entry.outcome) else {
            continue;
        };
        let report = *report;
        let service = Arc::clone(&service);
        let semaphore = Arc::clone(&semaphore);
        let index = entry.index;

        handles.push((
            position,
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                tracing::debug!("Requesting narrative for row {}", index);
                service.narrate(&input, &report).await
            }),
        ));
    }

    let mut results: Vec<AssessedStartup> = entries.into_iter().map(Into::into).collect();

    for (position, handle) in handles {
        let result = &mut results[position];
        match handle.await {
            Ok(Ok(text)) => result.ai_feedback = Some(text),
            Ok(Err(err)) => {
                tracing::warn!("Narrative for row {} failed: {}", result.entry.index, err);
                result.narrative_error = Some(err.to_string());
            }
            Err(join_err) => {
                tracing::warn!(
                    "Narrative task for row {} aborted: {}",
                    result.entry.index,
                    join_err
                );
                result.narrative_error = Some(format!("narrative task aborted: {}", join_err));
            }
        }
    }

    results
}
