//! `mediagen` -- run one RunningHub generation from the command line.
//!
//! # Environment variables
//!
//! | Variable                          | Required | Default                  |
//! |-----------------------------------|----------|--------------------------|
//! | `RUNNINGHUB_BASE_URL`             | no       | `http://localhost:3000`  |
//! | `RUNNINGHUB_UPLOAD_PATH`          | no       | `/api/runninghub/upload` |
//! | `RUNNINGHUB_SUBMIT_PATH`          | no       | `/api/runninghub`        |
//! | `RUNNINGHUB_STATUS_PATH`          | no       | `/api/runninghub/status` |
//! | `RUNNINGHUB_WEBAPP_ID`            | no       | --                       |
//! | `RUNNINGHUB_REQUEST_TIMEOUT_SECS` | no       | `60`                     |
//! | `RUNNINGHUB_STATUS_TIMEOUT_SECS`  | no       | `30`                     |
//! | `RUST_LOG`                        | no       | `mediagen=info`          |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mediagen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = mediagen_cli::run_from_env().await {
        tracing::error!(error = %format!("{e:#}"), "Generation failed");
        std::process::exit(1);
    }
}
