use docker_image_migrator::cli::{Args, Runner};
use docker_image_migrator::logging::Logger;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse_args().from_env();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            Logger::new(true).error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = runner.run().await {
        runner
            .output()
            .error(&format!("Migration aborted: {}", e));
        std::process::exit(e.exit_code());
    }
}
