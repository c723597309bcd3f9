//! Batch processor scenarios: splitting, bounded concurrency, retry,
//! aggregation, callbacks, and cancellation.
