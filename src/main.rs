use std::error::Error as _;
use std::process;

use s3_acl_report::{Client, Config, Error, Pipeline, Renderer};
use tracing_subscriber::EnvFilter;

const SUPPORT_MESSAGE: &str = "Oops! Something went wrong. If the problem persists, \
contact your support team and include the error shown above.";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    println!("OK, Lets go");

    let config = Config::from_env();
    match run(&config).await {
        Ok(path) => {
            println!("DONE, result saved into file {} in current folder", path);
        }
        Err(err) => {
            let mut printed = err.to_string();
            println!("err {}", printed);
            let mut source = err.source();
            while let Some(cause) = source {
                // Several variants already embed their source in the message.
                let message = cause.to_string();
                if !printed.contains(&message) {
                    println!("  caused by: {}", message);
                    printed = message;
                }
                source = cause.source();
            }
            println!("{}", SUPPORT_MESSAGE);
            process::exit(1);
        }
    }
}

async fn run(config: &Config) -> Result<String, Error> {
    let client = Client::new(config)?;
    tracing::info!(region = client.region(), "starting report run");
    let mut pipeline = Pipeline::new(client, Renderer::from_config(config));
    let summary = pipeline.run().await?;
    Ok(summary.artifact.path.display().to_string())
}
