use selfish_mining_sim::output;
use selfish_mining_sim::{Config, SimError, Simulation};

fn main() -> Result<(), SimError> {
    env_logger::init();

    let config = Config::parse(std::env::args())?;
    log::info!("starting run: n={} h0={} h1={} stop={}", config.n, config.h0, config.h1, config.stop);

    let mut sim = Simulation::new(config)?;
    sim.run();

    output::write_outputs(&sim)?;
    output::print_metrics(&sim);

    Ok(())
}
