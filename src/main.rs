use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Failures that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum LaunchError {
    #[error(transparent)]
    Rocket(#[from] RocketError),
}

async fn serve() -> Result<(), LaunchError> {
    let rocket = voting_backend::build().ignite().await?;
    info!("Config loaded and database connected");
    // From here on the logger fairing reports requests; Rocket's own lines are noise.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging from log4rs.yaml");

    if let Err(err) = serve().await {
        error!("Voting server stopped: {err}");
        std::process::exit(1)
    }
}
