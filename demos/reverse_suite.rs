// Demos are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Programmatic test suites
//!
//! Registers the sample project's suites in code, which allows predicate
//! expectations and in-process setup actions that suite files cannot express.
//!
//! # Usage
//!
//! ```bash
//! # From a SAM project directory with a built template.yaml
//! cargo run --example reverse_suite
//!
//! # Only the message receiver, one emulator process per test
//! cargo run --example reverse_suite -- messageReceiver.* command
//! ```

use std::process::ExitCode;
use std::time::Duration;

use samtest::prelude::*;

fn reverse_suite() -> Vec<TestCase> {
    vec![
        TestCase::new("should reverse string")
            .with_query([("s", "foo")])
            .expect(Expectation::literal("oof")),
        TestCase::new("should reverse string with function to test result")
            .with_query([("s", "bar")])
            .expect_status(200)
            .expect(Expectation::predicate(|response| response.body == "rab")),
    ]
}

fn timezone_suite() -> Vec<TestCase> {
    vec![
        TestCase::new("should get correct timezone for Fairbanks")
            .with_query([("city", "fairbanks, ak")])
            .expect(Expectation::literal(serde_json::json!([
                {"city": "Fairbanks, AK", "zone": "America/Anchorage"}
            ]))),
        // Only the fields listed here are compared.
        TestCase::new("should get correct timezone for Marseille")
            .with_query([("city", "Marseille, FRA")])
            .expect(Expectation::literal(serde_json::json!([{"zone": "Europe/Paris"}]))),
    ]
}

fn message_receiver_suite() -> Vec<TestCase> {
    vec![
        TestCase::new("should relay message")
            .with_env("foo", "bar")
            .with_query([("s", "baz")])
            .with_setup(Setup::action(|| async {
                tracing::info!("queue drained");
                Ok(())
            }))
            .expect(Expectation::async_predicate(|response: ResponseEnvelope| async move {
                // Give the relay time to land before checking.
                tokio::time::sleep(Duration::from_millis(250)).await;
                response.body == "bar#baz"
            })),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let selection = args
        .next()
        .map(|s| Selection::parse(&s).expect("invalid selector"))
        .unwrap_or_default();

    let mut config = HarnessConfig::load_or_default(DEFAULT_CONFIG_FILE).expect("invalid config");
    if let Some(transport) = args.next() {
        config.transport = transport.parse().expect("transport must be http or command");
    }

    let suites = TestRegistry::new()
        .with_suite("reverse", reverse_suite())
        .with_suite("getTimezone", timezone_suite())
        .with_suite("messageReceiver", message_receiver_suite());

    let mut runner = match Runner::from_config(&config, selection, false) {
        Ok(runner) => runner.with_registry(suites),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let state = runner.run().await;
    ExitCode::from(state.exit_code())
}
