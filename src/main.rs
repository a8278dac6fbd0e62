use schemaloom::config::DesignerConfig;
use schemaloom::sql::Dialect;
use schemaloom::store::SchemaStore;
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "schemaloom=debug" } else { "schemaloom=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <input.sql|input.json> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output <file>     Output file (default: stdout)");
        eprintln!("  -d, --dialect <name>    generic, mysql, postgresql, sqlserver, oracle, mongodb");
        eprintln!("  -c, --config <file>     Designer config (JSON)");
        eprintln!("  -v, --verbose           Debug logging");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut dialect: Option<Dialect> = None;
    let mut config_path: Option<String> = None;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-d" | "--dialect" => {
                i += 1;
                if i < args.len() {
                    dialect = Some(Dialect::from_str(&args[i]).unwrap_or_else(|| {
                        eprintln!("Invalid dialect: {}", args[i]);
                        process::exit(1);
                    }));
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(args[i].clone());
                }
            }
            "-v" | "--verbose" => verbose = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    init_logging(verbose);

    let config = match config_path {
        Some(path) => DesignerConfig::load(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("{}", e);
            process::exit(1);
        }),
        None => DesignerConfig::default(),
    };
    let dialect = dialect.unwrap_or(config.default_dialect);

    let input = match fs::read_to_string(input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", input_path, e);
            process::exit(1);
        }
    };

    let store = if input_path.ends_with(".json") {
        match SchemaStore::from_json(&input, config) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    } else {
        let name = Path::new(input_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "schema".to_string());
        let mut store = SchemaStore::with_config(&name, config);
        match store.import_from_sql(&input) {
            Ok(report) => {
                for skipped in &report.skipped {
                    warn!(statement = skipped.index, "skipped: {}", skipped.error);
                }
            }
            Err(e) => {
                eprintln!("Import error: {}", e);
                process::exit(1);
            }
        }
        store
    };

    for diagnostic in store.diagnostics() {
        let level = if diagnostic.is_error() { "error" } else { "warning" };
        eprintln!("{}: {}", level, diagnostic.message);
    }

    let output = match schemaloom::emit::emit(store.schema(), dialect) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &output) {
                eprintln!("Failed to write {}: {}", path, e);
                process::exit(1);
            }
        }
        None => print!("{}", output),
    }

    if store.diagnostics().iter().any(|d| d.is_error()) {
        process::exit(1);
    }
}
