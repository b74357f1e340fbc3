// CLI entry point for the Code Breaker server and clients.
//
// Usage:
//   codebreaker [server] [OPTIONS]
//     --port <PORT>             Game listen port (default: 8080)
//     --admin-port <PORT>       Admin listen port (default: 8081)
//     --no-admin                Disable the admin channel
//     --players <N>             Players per session (default: 2, 1 = solo)
//     --max-sessions <N>        Concurrent session cap (default: 16)
//     --turn-seconds <N>        Per-guess time limit (default: 30)
//     --forming-seconds <N>     Wait for a table to fill (default: 180)
//     --decision-seconds <N>    Play-again answer window (default: 30)
//     --seed <N>                Fixed code seed (default: clock)
//
//   codebreaker client [--addr <HOST:PORT>]    Play from the terminal
//   codebreaker admin  [--addr <HOST:PORT>] [--command <CMD>]
//
// Logging is controlled by RUST_LOG (tracing env-filter syntax).

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use codebreaker_server::client;
use codebreaker_server::{ServerConfig, start_server};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("client") => run_client(&args[2..]),
        Some("admin") => run_admin(&args[2..]),
        Some("server") => run_server(&args[2..]),
        Some("--help") | Some("-h") => print_usage(),
        _ => run_server(&args[1..]),
    }
}

fn run_server(args: &[String]) {
    let config = parse_server_args(args);

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("Code Breaker server listening on {addr}");
    if let Some(admin_addr) = handle.admin_addr() {
        println!("Admin channel on {admin_addr}");
    }
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM; sessions need no teardown beyond
    // their sockets closing.
    loop {
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn run_client(args: &[String]) {
    let addr = flag_value(args, "--addr").unwrap_or_else(|| "127.0.0.1:8080".into());
    if let Err(e) = client::run_client(&addr) {
        eprintln!("Client error: {e}");
        std::process::exit(1);
    }
}

fn run_admin(args: &[String]) {
    let addr = flag_value(args, "--addr").unwrap_or_else(|| "127.0.0.1:8081".into());
    let command = flag_value(args, "--command").unwrap_or_else(|| "stats".into());
    if let Err(e) = client::run_admin(&addr, &command) {
        eprintln!("Admin error: {e}");
        std::process::exit(1);
    }
}

/// Parse server options. Uses simple `std::env::args()` matching — no clap
/// dependency.
fn parse_server_args(args: &[String]) -> ServerConfig {
    let mut config = ServerConfig::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => config.port = numeric_flag(args, &mut i, "--port"),
            "--admin-port" => config.admin_port = Some(numeric_flag(args, &mut i, "--admin-port")),
            "--no-admin" => config.admin_port = None,
            "--players" => config.capacity = numeric_flag(args, &mut i, "--players"),
            "--max-sessions" => config.max_sessions = numeric_flag(args, &mut i, "--max-sessions"),
            "--turn-seconds" => {
                config.turn_timeout = Duration::from_secs(numeric_flag(args, &mut i, "--turn-seconds"));
            }
            "--forming-seconds" => {
                config.forming_timeout =
                    Duration::from_secs(numeric_flag(args, &mut i, "--forming-seconds"));
            }
            "--decision-seconds" => {
                config.decision_timeout =
                    Duration::from_secs(numeric_flag(args, &mut i, "--decision-seconds"));
            }
            "--seed" => config.code_seed = Some(numeric_flag(args, &mut i, "--seed")),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if config.capacity == 0 {
        eprintln!("--players must be at least 1");
        std::process::exit(1);
    }
    config
}

/// Read the value after a numeric flag, exiting with a message if missing
/// or malformed.
fn numeric_flag<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    *i += 1;
    args.get(*i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn print_usage() {
    println!("Usage: codebreaker [server|client|admin] [OPTIONS]");
    println!();
    println!("Server options:");
    println!("  --port <PORT>             Game listen port (default: 8080)");
    println!("  --admin-port <PORT>       Admin listen port (default: 8081)");
    println!("  --no-admin                Disable the admin channel");
    println!("  --players <N>             Players per session (default: 2, 1 = solo)");
    println!("  --max-sessions <N>        Concurrent session cap (default: 16)");
    println!("  --turn-seconds <N>        Per-guess time limit (default: 30)");
    println!("  --forming-seconds <N>     Wait for a table to fill (default: 180)");
    println!("  --decision-seconds <N>    Play-again answer window (default: 30)");
    println!("  --seed <N>                Fixed code seed (default: clock)");
    println!();
    println!("Client options:");
    println!("  --addr <HOST:PORT>        Server address (default: 127.0.0.1:8080)");
    println!();
    println!("Admin options:");
    println!("  --addr <HOST:PORT>        Admin address (default: 127.0.0.1:8081)");
    println!("  --command <CMD>           stats | stats-json (default: stats)");
    println!();
    println!("  --help, -h                Show this help");
}
