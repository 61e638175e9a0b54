use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod engine;
mod error;
mod lexer;
mod symbol_table;
mod vm_writer;

use crate::engine::LabelAllocator;
use crate::error::{CompileError, CompileResult};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CompileResult<()> {
    let arg = env::args().nth(1).ok_or(CompileError::Usage)?;
    let path = PathBuf::from(arg);

    let units = collect_units(&path)?;
    // One allocator for the whole run: label numbers stay unique across
    // every unit compiled together.
    let mut labels = LabelAllocator::default();
    for unit in &units {
        compile_unit(unit, &mut labels).map_err(|source| CompileError::Unit {
            path: unit.clone(),
            source: Box::new(source),
        })?;
    }
    Ok(())
}

fn collect_units(path: &Path) -> CompileResult<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = fs::read_dir(path).map_err(|source| CompileError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let mut units: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "jack"))
        .collect();
    units.sort();
    Ok(units)
}

/// Compiles one `.jack` file to a sibling `.vm` file. Output is buffered
/// and only written when the whole unit compiled, so a failed unit leaves
/// nothing behind.
fn compile_unit(path: &Path, labels: &mut LabelAllocator) -> CompileResult<()> {
    let source = fs::read_to_string(path).map_err(|source| CompileError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buffer = Vec::new();
    engine::compile(&source, labels, &mut buffer)?;
    let out_path = path.with_extension("vm");
    fs::write(&out_path, &buffer).map_err(|source| CompileError::File {
        path: out_path,
        source,
    })
}
