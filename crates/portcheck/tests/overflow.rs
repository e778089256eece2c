use portcheck::{OrFifoDut, Simulation, Testbench, TestbenchOptions};
use test_case::test_case;

/// Status sweeps (A not full, B not full, Y not empty) after each overflow
/// scenario.
#[test_case(true ; "burst")]
#[test_case(false ; "sequential")]
fn overflow_golden_vectors(burst: bool) {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        seed: 11,
        jitter_max: 16,
        burst_overflow: burst,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();

    let (initial, after_a, after_b, report) = sim
        .run(async move {
            seq.reset().await?;
            let initial = seq.status_sweep().await?;
            seq.or_operation(1, 0).await?;
            let after_a = seq.overflow_a().await?;
            let after_b = seq.overflow_b().await?;
            seq.drain().await?;
            let report = seq.finish()?;
            Ok((initial, after_a, after_b, report))
        })
        .unwrap();

    assert_eq!(initial, vec![1, 1, 0]);
    assert_eq!(after_a, vec![0, 1, 0]);
    assert_eq!(after_b, vec![1, 0, 1]);
    // The OR result left in Y by scenario B is never read, so nothing is
    // left pending in the scoreboard.
    assert_eq!(report.scoreboard.passes, 1);
    assert_eq!(report.scoreboard.pending, 0);
}

#[test]
fn status_sweep_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        jitter_max: 16,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();

    let pairs = sim
        .run(async move {
            seq.reset().await?;
            seq.overflow_a().await?;
            let mut pairs = Vec::new();
            for address in 0..3 {
                let first = seq.read_driver().read(address).await?;
                let second = seq.read_driver().read(address).await?;
                pairs.push((first, second));
            }
            Ok(pairs)
        })
        .unwrap();

    assert_eq!(pairs, vec![(0, 0), (1, 1), (0, 0)]);
}
