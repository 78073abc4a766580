//
// main.rs
//
// refsearch: find references across the projects of a solution manifest
//

use std::env;

use tokio_util::sync::CancellationToken;

use refsearch::cli;

fn print_usage() {
    println!(
        "refsearch {}, a cross-project find-references tool.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: refsearch <manifest.json> <symbol> [OPTIONS]

Available options:

--project NAME               Project declaring the symbol (default: first project mentioning it)
--kind KIND                  Symbol kind: type, method, property, field, event, parameter, local, other
--container NAME             Containing type or namespace
--no-cascade                 Search only the named symbol, not related symbols
--json                       Print results as JSON
--version                    Print the version
--help                       Print this help message

Environment:

RUST_LOG                     Log filter (e.g. refsearch=debug)
REFSEARCH_PERF               1 to log phase timings, verbose to also warn on slow phases
REFSEARCH_NO_CASCADE         1 to disable cascading by default

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = env::args().skip(1).collect();

    if argv.is_empty() {
        print_usage();
        return Ok(());
    }
    for arg in &argv {
        match arg.as_str() {
            "--version" => {
                println!("refsearch {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            _ => {}
        }
    }

    let args = cli::parse_args(&mut argv.into_iter()).map_err(|e| anyhow::anyhow!(e))?;

    env_logger::init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling search");
            on_interrupt.cancel();
        }
    });

    let output = cli::run_search(&args, cancel).await?;
    print!("{}", output);
    Ok(())
}
