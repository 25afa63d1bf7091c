use vectorborne::runner::run_with_args;

fn main() {
    match run_with_args(|_, _| Ok(())) {
        Ok(sim) => {
            let counts = sim.counts();
            println!(
                "t={:.2} events={} infected={} uninfected={} infested={} uninfested={} treated={}",
                sim.current_time(),
                sim.events_handled(),
                counts.infected,
                counts.uninfected,
                counts.infested,
                counts.uninfested,
                counts.treated,
            );
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
