use clap::Parser;
use eyebreak_client::{Cli, run};

#[tokio::main]
async fn main() -> Result<(), eyebreak_client::AppError> {
    run(Cli::parse()).await
}
