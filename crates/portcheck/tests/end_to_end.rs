use portcheck::{
    OrFifoDut, Simulation, Testbench, TestbenchError, TestbenchOptions, VerdictError, points,
    run_testbench,
};

#[test]
fn seed_42_single_operation() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        seed: 42,
        operations: 1,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();
    let scoreboard = seq.scoreboard();

    let report = sim
        .run(async move {
            seq.reset().await?;
            seq.status_sweep().await?;
            let values = seq.or_operation(1, 0).await?;
            assert_eq!(values[3], 1);
            seq.drain().await?;
            seq.finish()
        })
        .unwrap();

    assert_eq!(report.seed, 42);
    assert_eq!(report.scoreboard.expected, 1);
    assert_eq!(report.scoreboard.passes, 1);
    assert_eq!(report.scoreboard.mismatches, 0);
    assert_eq!(report.scoreboard.pending, 0);
    assert_eq!(scoreboard.borrow().pending().count(), 0);
    assert!(report.coverage_path.exists());

    let ab = report.coverage.item(points::CROSS_AB).unwrap();
    assert_eq!(ab.covered, 1);
    assert_eq!(ab.bins[2].label, "(1, 0)");
    assert_eq!(ab.bins[2].hits, 1);
}

#[test]
fn full_run_passes_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        seed: 42,
        operations: 8,
        jitter_max: 20,
        settle_cycles: 10,
        result_path: dir.path().join("results"),
        ..Default::default()
    };

    let report = run_testbench(OrFifoDut::default(), &options).unwrap();

    assert_eq!(report.scoreboard.passes, 8);
    assert_eq!(report.scoreboard.pending, 0);
    assert_eq!(report.coverage_path, dir.path().join("results/coverage.xml"));
    let xml = std::fs::read_to_string(&report.coverage_path).unwrap();
    assert!(xml.contains(r#"<cross name="top.cross.ab""#));
    assert!(report.end_time > 0);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["seed"], 42);
    assert_eq!(json["scoreboard"]["passes"], 8);
    assert_eq!(json["coverage"]["items"][0]["name"], "top.a");
    assert_eq!(json["coverage"]["items"][0]["kind"], "point");
}

#[test]
fn unread_result_fails_verdict() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        jitter_max: 4,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();
    let scoreboard = seq.scoreboard();

    let err = sim
        .run(async move {
            seq.reset().await?;
            scoreboard.borrow_mut().push_expected(1);
            seq.finish()
        })
        .unwrap_err();

    assert!(matches!(
        err,
        TestbenchError::Verdict(VerdictError::Unconsumed(1))
    ));
    // Coverage is exported even when the verdict fails.
    assert!(dir.path().join("coverage.xml").exists());
}
