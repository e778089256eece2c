use portcheck::{OrFifoDut, Simulation, Testbench, TestbenchOptions, dut::addr};
use test_case::test_case;

fn quick_options(dir: &std::path::Path, seed: u64) -> TestbenchOptions {
    TestbenchOptions {
        seed,
        jitter_max: 8,
        result_path: dir.to_path_buf(),
        ..Default::default()
    }
}

#[test_case(0, 0 => 0)]
#[test_case(0, 1 => 1)]
#[test_case(1, 0 => 1)]
#[test_case(1, 1 => 1)]
fn result_register_returns_or(a: u64, b: u64) -> u64 {
    let dir = tempfile::tempdir().unwrap();
    let options = quick_options(dir.path(), a * 2 + b);
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();

    let (values, report) = sim
        .run(async move {
            seq.reset().await?;
            let values = seq.or_operation(a, b).await?;
            let report = seq.finish()?;
            Ok((values, report))
        })
        .unwrap();

    assert_eq!(report.scoreboard.passes, 1);
    assert_eq!(report.scoreboard.pending, 0);
    // Status registers after the result moved into Y: both operand
    // buffers free, result waiting.
    assert_eq!(&values[..3], &[1, 1, 1]);
    values[addr::RESULT as usize]
}

#[test]
fn back_to_back_operations_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let options = quick_options(dir.path(), 7);
    let mut sim = Simulation::builder(OrFifoDut::default()).build().unwrap();
    let mut seq = Testbench::attach(&mut sim, &options).unwrap();

    let results = sim
        .run(async move {
            seq.reset().await?;
            let mut results = Vec::new();
            for (a, b) in [(0, 0), (1, 1), (0, 1), (0, 0), (1, 0)] {
                results.push(seq.or_operation(a, b).await?[3]);
            }
            seq.finish()?;
            Ok(results)
        })
        .unwrap();

    assert_eq!(results, vec![0, 1, 1, 0, 1]);
}
