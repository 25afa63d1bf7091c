use std::thread;
use std::time::{Duration, Instant};

use vectorborne::{Parameters, SimState, Simulation, StartArgs};

fn paused_simulation() -> Simulation {
    let mut sim = Simulation::new(Parameters::default()).unwrap();
    sim.start(&StartArgs {
        max_sim_days: 100_000,
        ..StartArgs::default()
    })
    .unwrap();
    sim.pause();
    sim
}

fn wait_for(sim_state: impl Fn() -> SimState, wanted: SimState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while sim_state() != wanted {
        assert!(Instant::now() < deadline, "timed out waiting for {wanted:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn single_step_from_another_thread() {
    let sim = paused_simulation();
    let controller = sim.controller();
    let handle = thread::spawn(move || {
        let mut sim = sim;
        let state = sim.run();
        (state, sim)
    });

    thread::sleep(Duration::from_millis(20));
    assert_eq!(controller.single_step(), SimState::SingleStep);
    wait_for(|| controller.state(), SimState::Paused);
    controller.stop();

    let (state, sim) = handle.join().unwrap();
    assert_eq!(state, SimState::Halted);
    assert_eq!(sim.events_handled(), 1);
}

#[test]
fn resume_then_stop_from_another_thread() {
    let sim = paused_simulation();
    let controller = sim.controller();
    let handle = thread::spawn(move || {
        let mut sim = sim;
        sim.run();
        sim
    });

    thread::sleep(Duration::from_millis(20));
    controller.resume();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(controller.stop(), SimState::Halted);
    assert_eq!(controller.resume(), SimState::Halted);

    let sim = handle.join().unwrap();
    assert!(sim.events_handled() > 0);
    assert_eq!(sim.state(), SimState::Halted);
}
