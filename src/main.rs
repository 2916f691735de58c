use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match lingomix::run().await {
        Ok(response) => {
            match serde_json::to_string(&response) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("lingomix: failed to encode response: {e}");
                    return ExitCode::FAILURE;
                }
            }
            if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("lingomix: {e}");
            ExitCode::from(2)
        }
    }
}
