use portcheck::{OrFifoDut, PortKind, Signal, Simulation};
use std::fs;

#[test]
fn test_vcd_generation() {
    let dir = tempfile::tempdir().unwrap();
    let vcd_path = dir.path().join("run.vcd");
    let mut sim = Simulation::builder(OrFifoDut::default())
        .vcd(&vcd_path)
        .build()
        .unwrap();
    let h = sim.handle();

    sim.run(async move {
        h.rising_edge().await;
        h.port(PortKind::Read).set(Signal::Address, 5)?;
        h.clock_cycles(2).await;
        Ok(())
    })
    .unwrap();

    let content = fs::read_to_string(&vcd_path).unwrap();
    assert!(content.contains("$var wire 1 ! CLK $end"));
    assert!(content.contains("$var wire 1 \" RST_N $end"));
    assert!(content.contains("$var wire 32"));
    assert!(content.contains("read_address"));
    assert!(content.contains("$enddefinitions $end"));
    assert!(content.contains("#0\n"));
    assert!(content.contains("#5\n"));
    assert!(content.contains("#20\n"));
    assert!(content.contains("b101 "));
}

#[test]
fn steps_without_changes_write_no_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let vcd_path = dir.path().join("quiet.vcd");
    let mut sim = Simulation::builder(OrFifoDut::default())
        .no_clock()
        .vcd(&vcd_path)
        .build()
        .unwrap();
    let h = sim.handle();

    sim.run(async move {
        h.timer(3).await;
        h.timer(4).await;
        h.timer(2).await;
        h.port(PortKind::Read).set(Signal::Address, 5)?;
        h.timer(1).await;
        Ok(())
    })
    .unwrap();

    // `sim` is still alive here; `run` flushed the writer.
    let content = fs::read_to_string(&vcd_path).unwrap();
    assert!(content.contains("#3\n"));
    assert!(!content.contains("#7\n"));
    assert!(content.contains("#9\nb101 "));
    assert!(!content.contains("#10\n"));
}

#[test]
fn vcd_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = Simulation::builder(OrFifoDut::default())
        .vcd(dir.path().join("missing/run.vcd"))
        .build()
        .unwrap_err();
    assert!(matches!(err, portcheck::TestbenchError::Io { .. }));
}
