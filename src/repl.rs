use std::io::{BufRead, Write};

use tracing::warn;

use crate::{
    chatbot::{FileChatbot, QueryResponse, RagChatbot},
    error::{Error, Result},
};

/// Print `prompt` and read one line. `None` at end of input.
fn prompt_line(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_response(
    output: &mut impl Write,
    response: &QueryResponse,
    show_sources: bool,
) -> Result<()> {
    if show_sources {
        writeln!(output, "{}", response.formatted())?;
    } else {
        writeln!(output, "{}", response.answer)?;
    }
    Ok(())
}

/// Ask questions against the whole dataset until end of input.
///
/// Blank lines are ignored. Any query failure ends the loop.
pub fn run_chat(
    chatbot: &mut RagChatbot,
    mut input: impl BufRead,
    mut output: impl Write,
    show_sources: bool,
) -> Result<()> {
    while let Some(query) = prompt_line(&mut input, &mut output, "New query: ")?
    {
        if query.is_empty() {
            continue;
        }
        let response = chatbot.query(&query)?;
        print_response(&mut output, &response, show_sources)?;
    }
    Ok(())
}

/// Ask questions about single files until end of input.
///
/// A file that is missing or cannot be parsed is reported and the loop goes
/// on; model failures end it.
pub fn run_summarize(
    chatbot: &mut FileChatbot,
    mut input: impl BufRead,
    mut output: impl Write,
    show_sources: bool,
) -> Result<()> {
    loop {
        let Some(file) = prompt_line(&mut input, &mut output, "Filename: ")?
        else {
            return Ok(());
        };
        if file.is_empty() {
            continue;
        }
        let Some(query) = prompt_line(&mut input, &mut output, "Query: ")?
        else {
            return Ok(());
        };

        match chatbot.query(&file, &query) {
            Ok(response) => {
                print_response(&mut output, &response, show_sources)?;
            }
            Err(e @ (Error::NotFound { .. } | Error::Load { .. })) => {
                warn!("{e}");
            }
            Err(e) => return Err(e),
        }
    }
}
