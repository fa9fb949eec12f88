//! Value writes, phase rules and run control seen through the GPI.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use gpi::{Gpi, HandleId, SetAction};
use gpi_config::GpiConfig;
use gpi_sim::{bootstrap, description, DataType, DesignBuilder, Language, SimEngine, SimError, Storage};

fn make_engine() -> SimEngine {
    let mut b = DesignBuilder::new(Language::Verilog, "top");
    let top = b.root();
    let a = b.signal(top, "a", DataType::vector(3, 0), Storage::Var).unwrap();
    let y = b.signal(top, "y", DataType::vector(3, 0), Storage::Net).unwrap();
    b.signal(top, "width", DataType::Integer, Storage::Const).unwrap();
    b.signal(top, "gain", DataType::Real, Storage::Var).unwrap();
    b.assign(top, y, a).unwrap();
    SimEngine::new(b.build())
}

fn lookup(gpi: &mut Gpi, name: &str) -> HandleId {
    let root = gpi.get_root_handle(None).unwrap();
    gpi.get_handle_by_name(root, name).unwrap()
}

#[test]
fn deposits_settle_through_assignments() {
    let engine = make_engine();
    let mut gpi = bootstrap(&engine, &GpiConfig::default()).unwrap();
    let a = lookup(&mut gpi, "a");
    let y = lookup(&mut gpi, "y");

    gpi.set_signal_value_binstr(a, "0110", SetAction::Deposit).unwrap();
    assert_eq!(gpi.get_signal_value_binstr(y).as_deref(), Some("ZZZZ"));
    engine.run_until(&mut gpi, 0).unwrap();
    assert_eq!(gpi.get_signal_value_binstr(a).as_deref(), Some("0110"));
    assert_eq!(gpi.get_signal_value_binstr(y).as_deref(), Some("0110"));
    assert_eq!(gpi.get_signal_value_int(y), Some(6));

    let bit = gpi.get_handle_by_index(a, 3).unwrap();
    gpi.set_signal_value_binstr(bit, "1", SetAction::NoDelay).unwrap();
    assert_eq!(gpi.get_signal_value_binstr(a).as_deref(), Some("1110"));
}

#[test]
fn force_holds_until_release() {
    let engine = make_engine();
    let mut gpi = bootstrap(&engine, &GpiConfig::default()).unwrap();
    let a = lookup(&mut gpi, "a");

    gpi.set_signal_value_binstr(a, "1111", SetAction::Force).unwrap();
    gpi.set_signal_value_binstr(a, "0000", SetAction::Deposit).unwrap();
    engine.run_until(&mut gpi, 1).unwrap();
    assert_eq!(gpi.get_signal_value_binstr(a).as_deref(), Some("1111"));

    gpi.set_signal_value_binstr(a, "1111", SetAction::Release).unwrap();
    gpi.set_signal_value_binstr(a, "0000", SetAction::Deposit).unwrap();
    engine.run_until(&mut gpi, 2).unwrap();
    assert_eq!(gpi.get_signal_value_binstr(a).as_deref(), Some("0000"));
}

#[test]
fn constants_and_read_only_phase_refuse_writes() {
    let engine = make_engine();
    let mut gpi = bootstrap(&engine, &GpiConfig::default()).unwrap();
    let width = lookup(&mut gpi, "width");
    assert!(gpi.handle(width).unwrap().is_const());
    assert!(gpi.set_signal_value_int(width, 3, SetAction::Deposit).is_err());

    let a = lookup(&mut gpi, "a");
    let outcome = Rc::new(RefCell::new(None));
    let seen = Rc::clone(&outcome);
    gpi.register_readonly_callback(move |gpi: &mut Gpi| {
        *seen.borrow_mut() = Some(gpi.set_signal_value_binstr(a, "0001", SetAction::Deposit).is_ok());
        Ok(())
    })
    .unwrap();
    engine.run_until(&mut gpi, 0).unwrap();
    assert_eq!(*outcome.borrow(), Some(false));
    assert_eq!(gpi.get_signal_value_binstr(a).as_deref(), Some("XXXX"));
}

#[test]
fn reals_and_precision() {
    let engine = make_engine();
    let mut gpi = bootstrap(&engine, &GpiConfig::default()).unwrap();
    let gain = lookup(&mut gpi, "gain");
    gpi.set_signal_value_real(gain, 0.25, SetAction::NoDelay).unwrap();
    assert_eq!(gpi.get_signal_value_real(gain), Some(0.25));
    assert_eq!(gpi.sim_precision(), Some(-12));
    assert_eq!(gpi.simulator_product().as_deref(), Some("gpi_sim"));
    assert_eq!(gpi.type_string(gain).as_deref(), Some("vpiRealVar"));
}

fn arm_forever(gpi: &mut Gpi) {
    gpi.register_readwrite_callback(|gpi: &mut Gpi| {
        arm_forever(gpi);
        Ok(())
    });
}

#[test]
fn runaway_read_write_loop_hits_the_delta_limit() {
    let engine = make_engine();
    engine.set_max_delta(50);
    let mut gpi = bootstrap(&engine, &GpiConfig::default()).unwrap();
    arm_forever(&mut gpi);
    let err = engine.run_until(&mut gpi, 0).unwrap_err();
    assert!(matches!(err, SimError::DeltaCycleLimit { ticks: 0, max_deltas: 50 }));
}

#[test]
fn described_design_runs_to_completion() {
    let text = r#"
        [design]
        top = "tb"
        language = "vhdl"
        precision = -9

        [[signals]]
        scope = "tb"
        name = "clk"
        init = "0"

        [[stimulus]]
        time = 5
        signal = "tb.clk"
        value = "1"

        [[stimulus]]
        time = 10
        signal = "tb.clk"
        value = "0"
    "#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    let engine = description::load(file.path()).unwrap().into_engine().unwrap();
    let mut gpi = bootstrap(&engine, &gpi_sim::mixed_language_config()).unwrap();

    let root = gpi.get_root_handle(Some("TB")).unwrap();
    let clk = gpi.get_handle_by_name(root, "clk").unwrap();
    let edges = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&edges);
    let cb = gpi
        .register_value_change_callback(clk, gpi::Edge::ValueChange, move |gpi: &mut Gpi| {
            seen.borrow_mut().push(gpi.sim_time());
            Ok(())
        })
        .unwrap();
    engine.run_until(&mut gpi, 7).unwrap();
    // Re-subscribe after the one-shot fire to see the falling edge too.
    let seen = Rc::clone(&edges);
    let again = gpi
        .register_value_change_callback(clk, gpi::Edge::ValueChange, move |gpi: &mut Gpi| {
            seen.borrow_mut().push(gpi.sim_time());
            Ok(())
        })
        .unwrap();
    assert_ne!(cb, again);
    engine.run_to_completion(&mut gpi).unwrap();
    assert_eq!(*edges.borrow(), vec![Some(5), Some(10)]);
    assert_eq!(gpi.time_precision(), gpi_common::TimePrecision::from_exponent(-9));
    assert!(engine.is_finished());
}
