//! Schemasmith command-line tool.

use clap::Parser;

use schemasmith_cli::{execute, init_tracing, Args};

fn main() {
    let args = Args::parse();
    if let Err(e) = init_tracing(args.log_level.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let (config, command) = args.into_config();
    tracing::debug!(
        catalog = %config.catalog_path.display(),
        live = config.database_url.is_some(),
        "configuration loaded"
    );

    match execute(config, command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
