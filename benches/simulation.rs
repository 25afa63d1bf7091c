use criterion::{criterion_group, criterion_main, Criterion};
use vectorborne::{Parameters, Simulation, StartArgs};

static SEED: i64 = 123;
static POPULATION: usize = 200;
static MAX_DAYS: u32 = 60;

fn shelter_run() -> Simulation {
    let parameters = Parameters {
        percent_showers: 0.3,
        percent_laundry: 0.3,
        percent_medical: 0.1,
        probability_treatment: 0.2,
        ..Parameters::default()
    };
    let mut sim = Simulation::new(parameters).expect("default parameters are valid");
    sim.start(&StartArgs {
        max_sim_days: MAX_DAYS,
        max_population: POPULATION,
        initial_population: POPULATION,
        seed: SEED,
        ..StartArgs::default()
    })
    .expect("grid holds the population");
    sim.run();
    sim
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("shelter run", |bencher| {
        bencher.iter_with_large_drop(shelter_run)
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
