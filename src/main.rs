mod calc;
mod config;
mod db;
mod ipc;
mod model;
mod session;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let config = config::Config::parse();
    if let Err(e) = config::initialize_tracing(&config) {
        eprintln!("schoold: {e:#}");
        return ExitCode::FAILURE;
    }

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
    };
    if let Some(path) = config.workspace.as_ref() {
        match db::open_db(path) {
            Ok(conn) => {
                tracing::info!(workspace = %path.display(), "workspace opened");
                state.workspace = Some(path.clone());
                state.db = Some(conn);
            }
            Err(e) => {
                tracing::error!(workspace = %path.display(), error = %format!("{e:#}"), "workspace open failed");
                return ExitCode::FAILURE;
            }
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "schoold ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable request line");
                ipc::bad_json(&e)
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, exiting");
    ExitCode::SUCCESS
}
