use portcheck::{OrFifoDut, TestbenchOptions, points, run_testbench};

fn options(dir: &std::path::Path, seed: u64) -> TestbenchOptions {
    TestbenchOptions {
        seed,
        result_path: dir.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn full_run_closes_every_cross() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_testbench(OrFifoDut::default(), &options(dir.path(), 42)).unwrap();

    assert_eq!(report.scoreboard.passes, 50);
    for cross in [points::CROSS_AB, points::CROSS_INPUT, points::CROSS_OUTPUT] {
        let item = report.coverage.item(cross).unwrap();
        assert!(item.is_complete(), "{cross} not closed: {item:?}");
    }
    let addresses = report.coverage.item(points::READ_ADDRESS).unwrap();
    assert!(addresses.is_complete());
    assert_eq!(report.coverage.covered_bins(), report.coverage.total_bins());
}

#[test]
fn sequential_overflow_never_sees_back_to_back_transactions() {
    let dir = tempfile::tempdir().unwrap();
    let sequential = TestbenchOptions {
        operations: 4,
        jitter_max: 20,
        burst_overflow: false,
        ..options(dir.path(), 3)
    };
    let report = run_testbench(OrFifoDut::default(), &sequential).unwrap();

    for (cross, txn_txn) in [
        (points::CROSS_INPUT, "(TxnWrite, TxnWrite)"),
        (points::CROSS_OUTPUT, "(TxnRead, TxnRead)"),
    ] {
        let item = report.coverage.item(cross).unwrap();
        assert_eq!(item.bins[3].label, txn_txn);
        assert_eq!(item.bins[3].hits, 0);
        assert_eq!(item.covered, 3);
    }
}

#[test]
fn same_seed_gives_identical_export() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let short_run = |dir: &std::path::Path| TestbenchOptions {
        operations: 6,
        jitter_max: 30,
        ..options(dir, 9)
    };

    let a = run_testbench(OrFifoDut::default(), &short_run(first.path())).unwrap();
    let b = run_testbench(OrFifoDut::default(), &short_run(second.path())).unwrap();

    assert_eq!(a.end_time, b.end_time);
    let xml_a = std::fs::read_to_string(&a.coverage_path).unwrap();
    let xml_b = std::fs::read_to_string(&b.coverage_path).unwrap();
    assert_eq!(xml_a, xml_b);
}
