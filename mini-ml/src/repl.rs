use std::io::{self, BufRead, Write};

use log::debug;

use crate::session::Session;

pub const HELP: &str = "\
Commands:
  <statement>        run a declaration or expression (trailing ; optional)
  :type, :t <expr>   show the inferred type of an expression
  :load, :l <path>   load a file of ;-terminated declarations
  :env               list bound names and their types
  :help, :h, :?      show this message
  :quit, :q          leave the REPL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Type(&'a str),
    Load(&'a str),
    Env,
    Help,
    Quit,
    Statement(&'a str),
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Command::Statement(line);
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "type" | "t" => Command::Type(arg),
            "load" | "l" => Command::Load(arg),
            "env" => Command::Env,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}

/// Reads commands from `input` until end of input or `:quit`, writing
/// results and errors to `output`.
pub fn run(session: &mut Session, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        debug!("repl input: {}", line);

        match Command::parse(&line) {
            Command::Quit => break,
            Command::Statement("") => {}
            Command::Statement(src) => match session.run_line(src) {
                Ok(report) => {
                    if let Some(tree) = &report.trace {
                        write!(output, "{}", tree)?;
                    }
                    writeln!(output, "{}", report)?;
                }
                Err(err) => writeln!(output, "error: {}", err)?,
            },
            Command::Type(src) => match session.type_of(src) {
                Ok((scheme, tree)) => {
                    if session.config().trace {
                        write!(output, "{}", tree)?;
                    }
                    writeln!(output, "{} : {}", src, scheme)?;
                }
                Err(err) => writeln!(output, "error: {}", err)?,
            },
            Command::Load(path) => match session.load_file(path) {
                Ok(reports) => {
                    for report in reports {
                        writeln!(output, "{}", report)?;
                    }
                }
                Err(err) => writeln!(output, "error: {}", err)?,
            },
            Command::Env => {
                for (name, scheme) in session.bindings() {
                    match scheme {
                        Some(scheme) => writeln!(output, "{} : {}", name, scheme)?,
                        None => writeln!(output, "{}", name)?,
                    }
                }
            }
            Command::Help => writeln!(output, "{}", HELP)?,
            Command::Unknown(name) => {
                writeln!(output, "unknown command :{} (try :help)", name)?;
            }
        }

        write!(output, "> ")?;
        output.flush()?;
    }
    Ok(())
}
