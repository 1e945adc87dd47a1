//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `blockide_core` linkage.
//! - `inspect <archive>` prints a project archive summary without touching
//!   the shell workspace.

use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => {
            println!("blockide_core ping={}", blockide_core::ping());
            println!("blockide_core version={}", blockide_core::core_version());
            ExitCode::SUCCESS
        }
        [command, archive] if command == "inspect" => inspect(Path::new(archive)),
        _ => {
            eprintln!("usage: blockide_cli [inspect <archive>]");
            ExitCode::from(2)
        }
    }
}

fn inspect(archive: &Path) -> ExitCode {
    let scratch = std::env::temp_dir().join(format!("blockide-inspect-{}", std::process::id()));
    let result = blockide_core::load_project(archive, &scratch);
    let _ = std::fs::remove_dir_all(&scratch);

    match result {
        Ok(loaded) => {
            let project = loaded.project;
            println!("name={}", project.name);
            println!("scenes={}", project.scenes.len());
            println!("objects={}", project.objects.len());
            println!("variables={}", project.variables.len());
            println!("assets={}", project.asset_refs().len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("inspect failed ({}): {err}", err.code());
            ExitCode::FAILURE
        }
    }
}
