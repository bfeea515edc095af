//! Property-Based Pipeline Tests
//!
//! Invariants that must hold for arbitrary inputs: clean runs commit every
//! item in order, and skipped items never reach the committed set.

use chunkflow::testing::{FailureInjectingProcessor, RecordingWriter};
use chunkflow::{ChunkConfig, ChunkOrchestrator, VecSource};
use proptest::prelude::*;

fn run_pipeline(
    items: Vec<u32>,
    failures: Vec<u32>,
    chunk_size: usize,
) -> (Vec<u32>, Vec<u32>, u32) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    rt.block_on(async {
        let mut orchestrator = ChunkOrchestrator::new(ChunkConfig {
            chunk_size,
            ..ChunkConfig::default()
        });
        let mut source = VecSource::new(items);
        let mut processor = FailureInjectingProcessor::with_failures(failures);
        let mut writer = RecordingWriter::new();

        let summary = orchestrator
            .run(&mut source, &mut processor, &mut writer)
            .await
            .expect("run should complete");

        (processor.processed(), processor.committed(), summary.skip_count)
    })
}

proptest! {
    #[test]
    fn clean_runs_commit_every_item_in_order(
        items in prop::collection::vec(any::<u32>(), 0..50),
        chunk_size in 1usize..8,
    ) {
        let (processed, committed, skip_count) = run_pipeline(items.clone(), vec![], chunk_size);
        prop_assert_eq!(processed, items.clone());
        prop_assert_eq!(committed, items);
        prop_assert_eq!(skip_count, 0);
    }

    #[test]
    fn skipped_items_never_reach_the_committed_set(
        len in 0usize..40,
        chunk_size in 1usize..8,
        mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        // Distinct items so failure records match exactly one item each.
        let items: Vec<u32> = (0..len as u32).collect();
        let failures: Vec<u32> = items
            .iter()
            .copied()
            .filter(|i| mask[*i as usize])
            .collect();

        let (processed, committed, skip_count) =
            run_pipeline(items.clone(), failures.clone(), chunk_size);

        let expected: Vec<u32> = items
            .iter()
            .copied()
            .filter(|i| !failures.contains(i))
            .collect();
        prop_assert_eq!(committed, expected);
        prop_assert_eq!(skip_count as usize, failures.len());
        for item in &items {
            prop_assert!(processed.contains(item));
        }
    }
}
