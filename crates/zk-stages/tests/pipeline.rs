use std::sync::atomic::{AtomicBool, AtomicI64};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;

use tempfile::TempDir;
use zk_db::{
    HermezDb, HermezDbReader, HermezRead, HermezWrite, L1InfoTreeUpdate, L1InjectedBatch, RwTx,
    ZkDb, get_stage_progress, get_stage_prune_progress,
};
use zk_stages::datastream::{
    BatchStart, Bookmark, DatastreamClient, FullL2Block, GerUpdate, TestDatastreamClient,
};
use zk_stages::definitions::{FOLLOWER_EXTERNAL_STAGES, SEQUENCER_EXTERNAL_STAGES};
use zk_stages::l1::L1Event;
use zk_stages::stages::{FinishStage, StageWorker, TrackUpstream};
use zk_stages::test_utils::{FixedWitnessGenerator, MemoryDataStreamServer, StaticL1Client};
use zk_stages::{
    CycleOutcome, DatastreamError, ExternalWorkers, FollowerCollaborators, ForwardOutcome,
    Interrupt, Pipeline, PipelineError, SequencerCollaborators, Stage, StageCtx, StageError,
    StageState, SyncStage, UnwindReason, UnwindState, ZkSyncConfig, default_pipeline,
    sequencer_pipeline, zk_unwind_order,
};

fn open_db() -> (TempDir, ZkDb) {
    let dir = tempfile::tempdir().unwrap();
    let db = ZkDb::open(&dir.path().join("zk.redb")).unwrap();
    (dir, db)
}

/// Blocks `1..=n`, two per batch, with state root `[n; 32]`.
fn blocks(n: u64) -> Vec<FullL2Block> {
    (1..=n)
        .map(|number| FullL2Block {
            batch_number: (number + 1) / 2,
            l2_block_number: number,
            fork_id: 7,
            state_root: [number as u8; 32],
            global_exit_root: if number == 3 { [0x33; 32] } else { [0; 32] },
            ..Default::default()
        })
        .collect()
}

fn cfg() -> ZkSyncConfig {
    let mut cfg = ZkSyncConfig::default();
    cfg.l1_syncer.start_block = 100;
    cfg
}

fn follower(
    cfg: &ZkSyncConfig,
    l1: StaticL1Client,
    l2_blocks: Vec<FullL2Block>,
    workers: ExternalWorkers,
) -> (Pipeline, MemoryDataStreamServer) {
    let client = TestDatastreamClient::new(l2_blocks, vec![]);
    follower_with(cfg, l1, Box::new(client), workers)
}

fn follower_with(
    cfg: &ZkSyncConfig,
    l1: StaticL1Client,
    datastream: Box<dyn DatastreamClient>,
    workers: ExternalWorkers,
) -> (Pipeline, MemoryDataStreamServer) {
    let server = MemoryDataStreamServer::default();
    let pipeline = default_pipeline(
        cfg,
        FollowerCollaborators {
            l1: Box::new(l1),
            datastream,
            witness: Box::new(FixedWitnessGenerator),
            datastream_server: Box::new(server.clone()),
            workers,
        },
    )
    .unwrap();
    (pipeline, server)
}

fn tracking_workers() -> ExternalWorkers {
    ExternalWorkers::new().track_all(&FOLLOWER_EXTERNAL_STAGES, SyncStage::Batches)
}

fn progress(tx: &RwTx, id: SyncStage) -> u64 {
    get_stage_progress(tx, id.name()).unwrap()
}

/// Tracks Batches and records the order in which it was unwound.
struct RecordingWorker {
    id: SyncStage,
    unwound: Arc<Mutex<Vec<SyncStage>>>,
}

impl StageWorker for RecordingWorker {
    fn forward(
        &mut self,
        ctx: &StageCtx,
        state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        TrackUpstream::new(SyncStage::Batches).forward(ctx, state, tx)
    }

    fn unwind(
        &mut self,
        _ctx: &StageCtx,
        _unwind: &UnwindState,
        _tx: &RwTx,
    ) -> Result<(), StageError> {
        self.unwound.lock().unwrap().push(self.id);
        Ok(())
    }
}

/// Sequencer-side execution: writes blocks 1..=5 into batches 1, 1, 2, 2, 3.
struct SequencingWorker;

impl StageWorker for SequencingWorker {
    fn forward(
        &mut self,
        _ctx: &StageCtx,
        _state: &StageState,
        tx: &RwTx,
    ) -> Result<ForwardOutcome, StageError> {
        let hdb = HermezDb::new(tx);
        for block in 1..=5u64 {
            hdb.write_block_batch(block, (block + 1) / 2)?;
        }
        Ok(ForwardOutcome::Advanced(5))
    }
}

/// Raises the interrupt once the block channel has been polled `after` times.
struct InterruptingClient {
    inner: TestDatastreamClient,
    interrupt: Interrupt,
    after: usize,
    polls: usize,
}

impl DatastreamClient for InterruptingClient {
    fn read_all_entries_to_channel(&mut self, bookmark: Bookmark) -> Result<(), DatastreamError> {
        self.inner.read_all_entries_to_channel(bookmark)
    }

    fn l2_block_rx(&mut self) -> &mut UnboundedReceiver<FullL2Block> {
        self.polls += 1;
        if self.polls == self.after {
            self.interrupt.send();
        }
        self.inner.l2_block_rx()
    }

    fn ger_updates_rx(&mut self) -> &mut UnboundedReceiver<GerUpdate> {
        self.inner.ger_updates_rx()
    }

    fn batch_start_rx(&mut self) -> &mut UnboundedReceiver<BatchStart> {
        self.inner.batch_start_rx()
    }

    fn err_rx(&mut self) -> &mut UnboundedReceiver<DatastreamError> {
        self.inner.err_rx()
    }

    fn last_written_time(&self) -> &AtomicI64 {
        self.inner.last_written_time()
    }

    fn streaming(&self) -> &AtomicBool {
        self.inner.streaming()
    }
}

#[test]
fn follower_cycle_runs_every_stage() {
    let (_dir, db) = open_db();
    let l1 = StaticL1Client::new(
        105,
        vec![
            (
                100,
                L1Event::Sequence {
                    l1_block_no: 100,
                    batch_no: 1,
                    l1_tx_hash: [0xa1; 32],
                    state_root: [2; 32],
                    l1_info_root: None,
                },
            ),
            (
                101,
                L1Event::Verification {
                    l1_block_no: 101,
                    batch_no: 1,
                    l1_tx_hash: [0xb1; 32],
                    state_root: [2; 32],
                },
            ),
        ],
    );
    let (mut pipeline, server) = follower(&cfg(), l1, blocks(6), tracking_workers());

    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new()).with_first_cycle(true);
    assert_eq!(pipeline.run_cycle(&tx, &ctx).unwrap(), CycleOutcome::Completed);

    assert_eq!(progress(&tx, SyncStage::L1Syncer), 105);
    assert_eq!(progress(&tx, SyncStage::Batches), 6);
    assert_eq!(progress(&tx, SyncStage::Execution), 6);
    assert_eq!(progress(&tx, SyncStage::TxLookup), 6);
    assert_eq!(progress(&tx, SyncStage::DataStream), 6);
    assert_eq!(progress(&tx, SyncStage::Finish), 6);
    // Batch 3 is the latest downloaded batch and is not witnessed yet.
    assert_eq!(progress(&tx, SyncStage::Witness), 4);
    assert_eq!(server.published(), 6);

    let hdb = HermezDb::new(&tx);
    assert_eq!(hdb.get_batch_no_by_l2_block(5).unwrap(), 3);
    assert_eq!(hdb.get_fork_id(3).unwrap(), 7);
    assert_eq!(hdb.get_fork_id_block(7).unwrap(), 1);
    assert!(hdb.get_global_exit_root(&[0x33; 32]).unwrap());
    assert_eq!(hdb.get_block_global_exit_root(3).unwrap().0, [0x33; 32]);
    assert_eq!(hdb.get_highest_verified_block_no().unwrap(), 2);
    assert_eq!(
        hdb.get_witness_by_batch_no(2).unwrap(),
        FixedWitnessGenerator::witness_for(2)
    );
    assert!(hdb.get_witness_by_batch_no(3).unwrap().is_empty());
    tx.commit().unwrap();

    let rx = db.begin_read().unwrap();
    let reader = HermezDbReader::new(&rx);
    assert_eq!(reader.get_latest_downloaded_batch_no().unwrap(), 3);
}

#[test]
fn state_root_mismatch_unwinds_to_previous_batch() {
    let (_dir, db) = open_db();
    let (mut pipeline, _) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new());
    pipeline.run_cycle(&tx, &ctx).unwrap();
    tx.commit().unwrap();

    let bad = L1Event::Verification {
        l1_block_no: 150,
        batch_no: 2,
        l1_tx_hash: [0xb2; 32],
        state_root: [0xee; 32],
    };
    let (mut pipeline, _) = follower(
        &cfg(),
        StaticL1Client::new(200, vec![(150, bad)]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    let outcome = pipeline.run_cycle(&tx, &ctx).unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Unwound {
            stage: SyncStage::L1Syncer,
            target: 2,
            reason: UnwindReason::StateRootMismatch {
                batch: 2,
                l1_state_root: [0xee; 32],
                local_state_root: [4; 32],
            },
        }
    );

    // L1 progress is kept; the stage re-scans from where it stopped.
    assert_eq!(progress(&tx, SyncStage::L1Syncer), 100);
    assert_eq!(progress(&tx, SyncStage::Batches), 2);
    assert_eq!(progress(&tx, SyncStage::Execution), 2);
    assert_eq!(progress(&tx, SyncStage::Finish), 2);
    assert_eq!(progress(&tx, SyncStage::Witness), 0);
    // Not part of the unwind order.
    assert_eq!(progress(&tx, SyncStage::CumulativeIndex), 6);

    let hdb = HermezDb::new(&tx);
    assert_eq!(hdb.get_batch_no_by_l2_block(2).unwrap(), 1);
    assert_eq!(hdb.get_batch_no_by_l2_block(3).unwrap(), 0);
    assert_eq!(hdb.get_state_root(2).unwrap(), [2; 32]);
    assert_eq!(hdb.get_state_root(3).unwrap(), [0; 32]);
    assert!(!hdb.get_global_exit_root(&[0x33; 32]).unwrap());
    assert!(hdb.get_verification_by_batch_no(2).unwrap().is_none());
    assert!(hdb.get_witness_by_batch_no(1).unwrap().is_empty());
    assert_eq!(hdb.get_fork_id_block(7).unwrap(), 1);
}

#[test]
fn unwind_follows_declared_order() {
    let (_dir, db) = open_db();
    let unwound = Arc::new(Mutex::new(Vec::new()));
    let mut workers = ExternalWorkers::new();
    for id in FOLLOWER_EXTERNAL_STAGES {
        workers.insert(
            id,
            Box::new(RecordingWorker {
                id,
                unwound: unwound.clone(),
            }),
        );
    }
    let (mut pipeline, _) = follower(&cfg(), StaticL1Client::new(100, vec![]), blocks(4), workers);

    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new());
    pipeline.forward(&tx, &ctx).unwrap();
    pipeline
        .unwind_to(&tx, &ctx, 1, UnwindReason::Requested("test".into()))
        .unwrap();

    let expected: Vec<SyncStage> = zk_unwind_order()
        .into_iter()
        .filter(|id| FOLLOWER_EXTERNAL_STAGES.contains(id))
        .collect();
    assert_eq!(*unwound.lock().unwrap(), expected);
    assert_eq!(progress(&tx, SyncStage::CumulativeIndex), 4);
}

#[test]
fn block_gap_fails_the_pass() {
    let (_dir, db) = open_db();
    let mut l2_blocks = blocks(4);
    l2_blocks.remove(2);
    let (mut pipeline, _) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        l2_blocks,
        tracking_workers(),
    );

    let tx = db.begin_write().unwrap();
    let err = pipeline
        .forward(&tx, &StageCtx::new(Interrupt::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: SyncStage::Batches,
            source: StageError::BlockGap {
                expected: 3,
                got: 4
            },
        }
    ));
    drop(tx);

    let tx = db.begin_write().unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 0);
    assert_eq!(HermezDb::new(&tx).get_batch_no_by_l2_block(1).unwrap(), 0);
}

#[test]
fn target_bounds_the_pass() {
    let (_dir, db) = open_db();
    let (mut pipeline, server) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new()).with_target(3);
    pipeline.forward(&tx, &ctx).unwrap();

    assert_eq!(progress(&tx, SyncStage::Batches), 3);
    assert_eq!(progress(&tx, SyncStage::Execution), 3);
    assert_eq!(progress(&tx, SyncStage::Finish), 3);
    assert_eq!(server.published(), 3);
}

#[test]
fn full_pass_resumes_after_targeted_pass() {
    let (_dir, db) = open_db();
    let (mut pipeline, server) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new()).with_target(3);
    pipeline.forward(&tx, &ctx).unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 3);

    pipeline.forward(&tx, &StageCtx::new(Interrupt::new())).unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 6);
    assert_eq!(progress(&tx, SyncStage::Finish), 6);
    assert_eq!(server.published(), 6);
    assert_eq!(HermezDb::new(&tx).get_state_root(6).unwrap(), [6; 32]);
}

#[test]
fn interrupted_download_resumes() {
    let (_dir, db) = open_db();
    let interrupt = Interrupt::new();
    // Poll 1 empties leftovers, polls 2 and 3 take blocks 1 and 2.
    let client = InterruptingClient {
        inner: TestDatastreamClient::new(blocks(6), vec![]),
        interrupt: interrupt.clone(),
        after: 3,
        polls: 0,
    };
    let (mut pipeline, _) = follower_with(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        Box::new(client),
        tracking_workers(),
    );

    let tx = db.begin_write().unwrap();
    let err = pipeline.forward(&tx, &StageCtx::new(interrupt)).unwrap_err();
    assert!(matches!(err, PipelineError::Interrupted));
    drop(tx);

    let tx = db.begin_write().unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 0);
    pipeline.forward(&tx, &StageCtx::new(Interrupt::new())).unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 6);
    assert_eq!(progress(&tx, SyncStage::Finish), 6);
}

#[test]
fn side_entries_follow_block_progress() {
    let (_dir, db) = open_db();
    let mut l2_blocks = blocks(6);
    for block in &mut l2_blocks[4..] {
        block.fork_id = 8;
    }
    let update = |batch_number: u64| GerUpdate {
        batch_number,
        global_exit_root: [0x40 + batch_number as u8; 32],
        timestamp: 1_000 + batch_number,
        ..Default::default()
    };
    let client = TestDatastreamClient::new(l2_blocks, vec![update(2), update(3)]);
    client.push_batch_start(BatchStart {
        number: 3,
        fork_id: 8,
        ..Default::default()
    });
    let (mut pipeline, _) = follower_with(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        Box::new(client),
        tracking_workers(),
    );

    // Block 4 closes batch 2; batch 3 facts wait.
    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new()).with_target(4);
    pipeline.forward(&tx, &ctx).unwrap();
    {
        let hdb = HermezDb::new(&tx);
        assert_eq!(progress(&tx, SyncStage::Batches), 4);
        assert_eq!(hdb.get_batch_global_exit_root(2).unwrap(), Some(update(2)));
        assert!(hdb.get_global_exit_root(&[0x42; 32]).unwrap());
        assert!(hdb.get_batch_global_exit_root(3).unwrap().is_none());
        assert!(!hdb.get_global_exit_root(&[0x43; 32]).unwrap());
        assert_eq!(hdb.get_fork_id(3).unwrap(), 7);
        assert_eq!(hdb.get_fork_id_block(8).unwrap(), 0);
    }

    pipeline.forward(&tx, &StageCtx::new(Interrupt::new())).unwrap();
    {
        let hdb = HermezDb::new(&tx);
        assert_eq!(progress(&tx, SyncStage::Batches), 6);
        assert_eq!(hdb.get_batch_global_exit_root(3).unwrap(), Some(update(3)));
        assert!(hdb.get_global_exit_root(&[0x43; 32]).unwrap());
        assert_eq!(hdb.get_fork_id(3).unwrap(), 8);
        assert_eq!(hdb.get_fork_id_block(8).unwrap(), 5);
    }

    // Block 2 closes batch 1, so every batch GER above it goes.
    let ctx = StageCtx::new(Interrupt::new());
    pipeline
        .unwind_to(&tx, &ctx, 2, UnwindReason::Requested("test".into()))
        .unwrap();
    let hdb = HermezDb::new(&tx);
    assert!(hdb.get_batch_global_exit_root(2).unwrap().is_none());
    assert!(hdb.get_batch_global_exit_root(3).unwrap().is_none());
    assert_eq!(hdb.get_fork_id(3).unwrap(), 7);
}

#[test]
fn datastream_error_fails_the_pass() {
    let (_dir, db) = open_db();
    let client = TestDatastreamClient::new(blocks(2), vec![]);
    client.push_error(DatastreamError::Connection("reset by peer".into()));
    let (mut pipeline, _) = follower_with(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        Box::new(client),
        tracking_workers(),
    );

    let tx = db.begin_write().unwrap();
    let err = pipeline
        .forward(&tx, &StageCtx::new(Interrupt::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: SyncStage::Batches,
            source: StageError::Datastream(DatastreamError::Connection(_)),
        }
    ));
    assert_eq!(progress(&tx, SyncStage::Batches), 0);

    // The error was consumed; the next pass downloads normally.
    pipeline.forward(&tx, &StageCtx::new(Interrupt::new())).unwrap();
    assert_eq!(progress(&tx, SyncStage::Batches), 2);
}

#[test]
fn interrupt_stops_the_pass() {
    let (_dir, db) = open_db();
    let (mut pipeline, _) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        blocks(2),
        tracking_workers(),
    );
    let interrupt = Interrupt::new();
    interrupt.send();
    let tx = db.begin_write().unwrap();
    let err = pipeline.forward(&tx, &StageCtx::new(interrupt)).unwrap_err();
    assert!(matches!(err, PipelineError::Interrupted));
    assert_eq!(progress(&tx, SyncStage::L1Syncer), 0);
}

#[test]
fn disabled_witness_stage_is_skipped() {
    let (_dir, db) = open_db();
    let mut cfg = cfg();
    cfg.witness.enabled = false;
    let (mut pipeline, _) = follower(
        &cfg,
        StaticL1Client::new(100, vec![]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    pipeline.forward(&tx, &StageCtx::new(Interrupt::new())).unwrap();
    assert_eq!(progress(&tx, SyncStage::Witness), 0);
    assert_eq!(progress(&tx, SyncStage::Finish), 6);
    assert!(HermezDb::new(&tx).get_witness_by_batch_no(1).unwrap().is_empty());
}

#[test]
fn prune_is_bounded_by_forward_progress() {
    let (_dir, db) = open_db();
    let (mut pipeline, _) = follower(
        &cfg(),
        StaticL1Client::new(100, vec![]),
        blocks(6),
        tracking_workers(),
    );
    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new());
    pipeline.forward(&tx, &ctx).unwrap();
    pipeline.prune(&tx, &ctx, 5).unwrap();

    let prune_progress = |id: SyncStage| get_stage_prune_progress(&tx, id.name()).unwrap();
    assert_eq!(prune_progress(SyncStage::Witness), 4);
    assert_eq!(prune_progress(SyncStage::Batches), 5);

    let hdb = HermezDb::new(&tx);
    assert!(hdb.get_witness_by_batch_no(1).unwrap().is_empty());
    assert_eq!(
        hdb.get_witness_by_batch_no(2).unwrap(),
        FixedWitnessGenerator::witness_for(2)
    );

    // A lower boundary never moves prune progress backwards.
    pipeline.prune(&tx, &ctx, 3).unwrap();
    assert_eq!(prune_progress(SyncStage::Batches), 5);
}

fn sequencer(l1: StaticL1Client) -> (Pipeline, MemoryDataStreamServer) {
    let server = MemoryDataStreamServer::default();
    let workers = ExternalWorkers::new()
        .track_all(&SEQUENCER_EXTERNAL_STAGES, SyncStage::Execution)
        .with(SyncStage::Execution, SequencingWorker);
    let pipeline = sequencer_pipeline(
        &cfg(),
        SequencerCollaborators {
            l1: Box::new(l1),
            witness: Box::new(FixedWitnessGenerator),
            datastream_server: Box::new(server.clone()),
            workers,
        },
    )
    .unwrap();
    (pipeline, server)
}

fn info_tree_update(index: u64) -> L1InfoTreeUpdate {
    L1InfoTreeUpdate {
        index,
        ger: [index as u8 + 1; 32],
        block_number: 100 + index,
        ..Default::default()
    }
}

#[test]
fn sequencer_cycle() {
    let (_dir, db) = open_db();
    let injected = L1InjectedBatch {
        l1_block_number: 100,
        transaction: vec![0xde, 0xad],
        ..Default::default()
    };
    let (mut pipeline, server) = sequencer(StaticL1Client::new(
        110,
        vec![
            (100, L1Event::InjectedBatch(injected.clone())),
            (100, L1Event::InfoTreeUpdate(info_tree_update(0))),
            (101, L1Event::InfoTreeUpdate(info_tree_update(1))),
        ],
    ));

    let tx = db.begin_write().unwrap();
    let ctx = StageCtx::new(Interrupt::new());
    assert_eq!(pipeline.run_cycle(&tx, &ctx).unwrap(), CycleOutcome::Completed);

    assert_eq!(progress(&tx, SyncStage::L1Syncer), 110);
    assert_eq!(progress(&tx, SyncStage::Execution), 5);
    assert_eq!(progress(&tx, SyncStage::Witness), 4);
    assert_eq!(progress(&tx, SyncStage::IntermediateHashes), 5);
    assert_eq!(progress(&tx, SyncStage::CallTraces), 0);
    assert_eq!(progress(&tx, SyncStage::Finish), 5);
    assert_eq!(server.published(), 5);

    let hdb = HermezDb::new(&tx);
    assert_eq!(hdb.get_latest_l1_info_tree_update().unwrap().unwrap().index, 1);
    assert_eq!(hdb.get_l1_injected_batch(0).unwrap(), Some(injected));

    pipeline
        .unwind_to(&tx, &ctx, 2, UnwindReason::BadBlock { block: 3 })
        .unwrap();
    assert_eq!(progress(&tx, SyncStage::Execution), 2);
    assert_eq!(progress(&tx, SyncStage::Witness), 0);
    assert_eq!(progress(&tx, SyncStage::Finish), 2);
    // Neither is part of the sequencer unwind order.
    assert_eq!(progress(&tx, SyncStage::L1Syncer), 110);
    assert_eq!(progress(&tx, SyncStage::DataStream), 5);
}

#[test]
fn info_tree_gap_is_an_error() {
    let (_dir, db) = open_db();
    let (mut pipeline, _) = sequencer(StaticL1Client::new(
        110,
        vec![
            (100, L1Event::InfoTreeUpdate(info_tree_update(0))),
            (101, L1Event::InfoTreeUpdate(info_tree_update(2))),
        ],
    ));
    let tx = db.begin_write().unwrap();
    let err = pipeline
        .forward(&tx, &StageCtx::new(Interrupt::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: SyncStage::L1Syncer,
            source: StageError::L1InfoTreeGap {
                expected: 1,
                got: 2
            },
        }
    ));
}

#[test]
fn duplicate_stages_are_rejected() {
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(FinishStage), Box::new(FinishStage)];
    let err = Pipeline::new(stages, vec![]);
    assert!(matches!(err, Err(PipelineError::DuplicateStage(SyncStage::Finish))));

    let err = Pipeline::new(vec![], vec![SyncStage::Finish, SyncStage::Finish]);
    assert!(matches!(
        err,
        Err(PipelineError::DuplicateUnwindEntry(SyncStage::Finish))
    ));
}
