// Spawns a population of vehicles on the crossing, waits for all of them to
// finish, and prints how full the crossing was and how long vehicles waited.
// The same population runs twice: once on the condition variable backend and
// once on the semaphore backend.

use embassy_executor::{SpawnError, Spawner};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    semaphore::{GreedySemaphore, Semaphore},
};
use env_logger::Env;

use crossing_sim::config::NUM_CARS;
use crossing_sim::{
    Backend, CondvarBackend, Crossing, Report, SemaphoreBackend, SimulationConfig,
    SimulationError, Vehicle,
};

static CONDVAR_CROSSING: Crossing<CondvarBackend> = Crossing::new(CondvarBackend::new());
static SEMAPHORE_CROSSING: Crossing<SemaphoreBackend> = Crossing::new(SemaphoreBackend::new());

// One permit for every vehicle that has finished all of its iterations.
static FINISHED: GreedySemaphore<CriticalSectionRawMutex> = GreedySemaphore::new(0);

#[embassy_executor::task(pool_size = NUM_CARS)]
async fn condvar_vehicle(vehicle: Vehicle) {
    vehicle.run(&CONDVAR_CROSSING).await;
    FINISHED.release(1);
}

#[embassy_executor::task(pool_size = NUM_CARS)]
async fn semaphore_vehicle(vehicle: Vehicle) {
    vehicle.run(&SEMAPHORE_CROSSING).await;
    FINISHED.release(1);
}

fn population(config: &SimulationConfig) -> Vec<Vehicle> {
    let mut rng = rand::thread_rng();
    (0..config.vehicles)
        .map(|id| Vehicle::random(id, config, &mut rng))
        .collect()
}

async fn join_vehicles(count: usize) {
    let Ok(finished) = FINISHED.acquire(count).await;
    finished.disarm();
}

async fn simulate<B: Backend>(
    crossing: &'static Crossing<B>,
    vehicles: &[Vehicle],
    config: &SimulationConfig,
    spawn: impl Fn(Vehicle) -> Result<(), SpawnError>,
) -> Result<(), SimulationError> {
    for vehicle in vehicles {
        spawn(*vehicle).map_err(|cause| SimulationError::Spawn {
            vehicle: vehicle.id,
            cause,
        })?;
    }
    join_vehicles(vehicles.len()).await;

    let statistics = crossing.statistics().snapshot();
    let expected = config.total_crossings();
    if statistics.occupancy.total() != expected || statistics.waits.total() != expected {
        return Err(SimulationError::Accounting {
            expected,
            occupancy: statistics.occupancy.total(),
            waits: statistics.waits.total(),
        });
    }

    log::info!(
        "{} vehicles made {} crossings using {}",
        vehicles.len(),
        expected,
        crossing.backend_name()
    );
    println!("{}", Report::new(crossing.backend_name(), &statistics));
    Ok(())
}

async fn run(spawner: Spawner, config: &SimulationConfig) -> Result<(), SimulationError> {
    config.validate()?;
    // Every vehicle needs a task slot.
    if config.vehicles > NUM_CARS {
        return Err(SimulationError::TooManyVehicles {
            vehicles: config.vehicles,
            limit: NUM_CARS,
        });
    }
    let vehicles = population(config);

    simulate(&CONDVAR_CROSSING, &vehicles, config, |vehicle| {
        spawner.spawn(condvar_vehicle(vehicle))
    })
    .await?;
    simulate(&SEMAPHORE_CROSSING, &vehicles, config, |vehicle| {
        spawner.spawn(semaphore_vehicle(vehicle))
    })
    .await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = SimulationConfig::default();
    let status = match run(spawner, &config).await {
        Ok(()) => 0,
        Err(error) => {
            log::error!("{error}");
            1
        }
    };
    std::process::exit(status);
}
