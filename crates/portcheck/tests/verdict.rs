use portcheck::{
    BusState, Dut, OrFifoDut, Simulation, Testbench, TestbenchError, TestbenchOptions,
    VerdictError, dut::addr,
};

/// Reads the result register as zero.
struct StuckResult(OrFifoDut);

impl Dut for StuckResult {
    fn name(&self) -> &str {
        "stuck_result"
    }

    fn clock_edge(&mut self, bus: &BusState) {
        self.0.clock_edge(bus);
    }

    fn settle(&self, bus: &mut BusState) {
        self.0.settle(bus);
        if bus.read.address == addr::RESULT {
            bus.read.data = 0;
        }
    }
}

#[test]
fn mismatches_fail_the_run_without_stopping_it() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        jitter_max: 10,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(StuckResult(OrFifoDut::default()))
        .build()
        .unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();
    let scoreboard = seq.scoreboard();

    let err = sim
        .run(async move {
            seq.reset().await?;
            seq.or_operation(1, 1).await?;
            seq.or_operation(0, 0).await?;
            seq.or_operation(0, 1).await?;
            seq.finish()
        })
        .unwrap_err();

    assert!(matches!(
        err,
        TestbenchError::Verdict(VerdictError::Mismatches {
            mismatches: 2,
            unconsumed: 0
        })
    ));
    let summary = scoreboard.borrow().summary();
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.expected, 3);
}

#[test]
fn extra_result_read_is_only_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let options = TestbenchOptions {
        jitter_max: 10,
        result_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();

    let report = sim
        .run(async move {
            seq.reset().await?;
            seq.or_operation(1, 0).await?;
            seq.read_driver().read(addr::RESULT).await?;
            seq.finish()
        })
        .unwrap();

    assert_eq!(report.scoreboard.passes, 1);
    assert_eq!(report.scoreboard.underflows, 1);
}
