//! Full-lifecycle scenarios: bootstrap, reuse loop, shutdown.

use {
    crate::harness::{dt_overlay, InstanceSetup, DT},
    mcf_coupling_model::{Operator, SettingValue},
    mcf_instance_runtime::{Data, Message, SETTINGS_IN_PORT},
    std::sync::Arc,
};

#[test]
fn coupled_submodel_runs_until_settings_input_closes() {
    let mut fixture = InstanceSetup::new("micro")
        .with_settings_in()
        .scalar_port("init_in", Operator::FInit, true)
        .scalar_port("final_out", Operator::OF, true)
        .with_base_setting("t_max", SettingValue::Float(1.0))
        .build();
    let comm = Arc::clone(&fixture.comm);
    let manager = Arc::clone(&fixture.manager);

    // Two iterations' worth of inputs, then the termination sentinels.
    fixture.queue_overlay(dt_overlay(DT));
    fixture.queue_overlay(dt_overlay(2.0 * DT));
    fixture.queue_close(SETTINGS_IN_PORT, None);
    fixture.queue("init_in", None, Message::new(0.0, Data::Int(40)));
    fixture.queue("init_in", None, Message::new(0.0, Data::Int(41)));
    fixture.queue_close("init_in", None);

    let mut iterations = 0;
    while fixture.instance.reuse_instance(true).unwrap() {
        let state = fixture.instance.receive("init_in", None, None).unwrap();
        assert!(state.settings.is_none());

        let dt: f64 = fixture.instance.get_setting_as("dt").unwrap();
        let t_max: f64 = fixture.instance.get_setting_as("t_max").unwrap();
        assert!(dt < t_max);

        fixture
            .instance
            .send("final_out", Message::new(t_max, state.data), None)
            .unwrap();
        iterations += 1;
    }
    drop(fixture);

    assert_eq!(iterations, 2);
    {
        let comm = comm.lock();
        // Each sent message carries the overlay of its own iteration.
        assert_eq!(comm.sent.len(), 2);
        assert_eq!(comm.sent[0].2.settings, Some(dt_overlay(DT)));
        assert_eq!(comm.sent[1].2.settings, Some(dt_overlay(2.0 * DT)));
        // Shutdown closed the outgoing port and stopped the transport.
        assert_eq!(comm.closed, vec![("final_out".to_string(), None)]);
        assert_eq!(comm.shutdowns, 1);
    }
    let manager = manager.lock();
    assert_eq!(manager.registrations.len(), 1);
    assert_eq!(manager.deregistrations.len(), 1);
}

#[test]
fn vector_ports_pre_receive_and_close_per_slot() {
    let mut fixture = InstanceSetup::new("macro")
        .vector_port("bc_in", Operator::FInit, true, 2, false)
        .vector_port("bc_out", Operator::OI, true, 2, true)
        .build();
    let comm = Arc::clone(&fixture.comm);

    // Slot 0 serves the length probe first, then the regular sweep.
    fixture.queue("bc_in", Some(0), Message::new(0.0, Data::Float(1.5)));
    fixture.queue("bc_in", Some(0), Message::new(0.0, Data::Float(1.5)));
    fixture.queue("bc_in", Some(1), Message::new(0.0, Data::Float(2.5)));

    assert!(fixture.instance.reuse_instance(true).unwrap());

    assert_eq!(
        fixture.instance.receive("bc_in", Some(0), None).unwrap().data,
        Data::Float(1.5),
    );
    assert_eq!(
        fixture.instance.receive("bc_in", Some(1), None).unwrap().data,
        Data::Float(2.5),
    );

    // Resize the resizable output and send on every slot.
    fixture.instance.set_port_length("bc_out", 3).unwrap();
    for slot in 0..3 {
        fixture
            .instance
            .send("bc_out", Message::new(0.0, Data::Int(slot as i64)), Some(slot))
            .unwrap();
    }

    // The peers close our inputs so that shutdown can drain them.
    fixture.queue_close("bc_in", Some(0));
    fixture.queue_close("bc_in", Some(1));
    drop(fixture);

    let comm = comm.lock();
    assert_eq!(comm.sent.len(), 3);
    let mut closed = comm.closed.clone();
    closed.sort();
    assert_eq!(
        closed,
        vec![
            ("bc_out".to_string(), Some(0)),
            ("bc_out".to_string(), Some(1)),
            ("bc_out".to_string(), Some(2)),
        ],
    );
    // Both input slots were drained to their sentinels.
    assert!(comm.queued[&("bc_in".to_string(), Some(0))].is_empty());
    assert!(comm.queued[&("bc_in".to_string(), Some(1))].is_empty());
}

#[test]
fn parallel_universe_data_aborts_the_run_cleanly() {
    let mut fixture = InstanceSetup::new("macro")
        .with_settings_in()
        .scalar_port("s_in", Operator::S, true)
        .build();
    let comm = Arc::clone(&fixture.comm);
    let manager = Arc::clone(&fixture.manager);

    fixture.queue_overlay(dt_overlay(0.1));
    fixture.queue(
        "s_in",
        None,
        Message::new(0.0, Data::Int(1)).with_settings(dt_overlay(0.2)),
    );

    assert!(fixture.instance.reuse_instance(true).unwrap());

    let err = fixture.instance.receive("s_in", None, None).unwrap_err();
    assert!(err.to_string().contains("parallel universe"));
    assert_eq!(manager.lock().deregistrations.len(), 1);

    // The failed receive already shut everything down; dropping the
    // instance must not deregister again.
    drop(fixture);
    assert_eq!(manager.lock().deregistrations.len(), 1);
    assert_eq!(comm.lock().shutdowns, 1);
}

#[test]
fn uncoupled_submodel_runs_exactly_once() {
    let mut fixture = InstanceSetup::new("solo").build();
    let manager = Arc::clone(&fixture.manager);

    let mut iterations = 0;
    while fixture.instance.reuse_instance(true).unwrap() {
        iterations += 1;
        assert!(iterations < 10, "reuse loop failed to terminate");
    }
    assert_eq!(iterations, 1);
    drop(fixture);

    let manager = manager.lock();
    assert_eq!(manager.registrations.len(), 1);
    assert_eq!(manager.deregistrations.len(), 1);
    // Register, connect, and deregister were profiled and flushed in one
    // batch at shutdown.
    assert_eq!(manager.profile_batches, vec![3]);
}
