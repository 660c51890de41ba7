use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use crate::{error::Result, loader::DocumentChunk};

pub const NO_RESULTS_LINE: &str = "No results were found for this query.";

/// Write the ranked results of one query to `{log_dir}/{query_id}.txt`.
///
/// Each result is written as its rank and score followed by its full text.
/// After a blank line comes the best score as a percentage, or
/// [`NO_RESULTS_LINE`] when nothing was retrieved. The directory is created
/// if needed and an existing file is overwritten.
pub fn log_results(
    results: &[DocumentChunk],
    query_id: u64,
    log_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!("{query_id}.txt"));
    std::fs::write(&path, render(results))?;
    Ok(path)
}

fn render(results: &[DocumentChunk]) -> String {
    let mut out = String::new();
    for (rank, chunk) in results.iter().enumerate() {
        let score = chunk.score().unwrap_or_default();
        let _ = writeln!(out, "Result {rank} with score {score}");
        out.push_str(chunk.text());
        out.push('\n');
    }
    out.push('\n');

    match results.first() {
        Some(best) => {
            let percent = best.score().unwrap_or_default() * 100.0;
            let _ = write!(
                out,
                "The best result has a similarity score of {percent:.2}%"
            );
        }
        None => out.push_str(NO_RESULTS_LINE),
    }
    out
}
