mod app;
mod blob_store;
mod cli;
mod cloud_scaler;
mod config;
mod control_plane;
mod domain;
mod engine;
mod error;

use app::App;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let exit_code = App::run(cli).await;
    std::process::ExitCode::from(exit_code as u8)
}
