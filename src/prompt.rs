//! Interactive terminal prompts
//!
//! Prompts read from any `BufRead` and write to any `Write`, so the same code
//! drives stdin/stdout at runtime and in-memory buffers in tests.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use colored::Colorize;

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Result<String> {
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from terminal")?;

        if read == 0 {
            bail!("Input closed before setup finished");
        }

        Ok(line.trim().to_string())
    }

    /// Ask a question; an empty answer means "not provided"
    pub fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        let answer = self.read_line()?;

        Ok((!answer.is_empty()).then_some(answer))
    }

    /// Ask until a non-empty answer is given
    pub fn ask_required(&mut self, label: &str) -> Result<String> {
        loop {
            if let Some(answer) = self.ask(label)? {
                return Ok(answer);
            }
            writeln!(self.output, "{} A value is required", "⚠".yellow())?;
        }
    }

    pub fn confirm(&mut self, label: &str, default_yes: bool) -> Result<bool> {
        let hint = if default_yes { "Y/n" } else { "y/N" };

        loop {
            write!(self.output, "{} [{}]: ", label, hint)?;
            let answer = self.read_line()?.to_lowercase();

            match answer.as_str() {
                "" => return Ok(default_yes),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "{} Please answer y or n", "⚠".yellow())?,
            }
        }
    }

    /// Numbered menu; returns the 0-based index of the chosen option
    pub fn choose(&mut self, label: &str, options: &[&str], default: usize) -> Result<usize> {
        writeln!(self.output, "{}", label.blue())?;
        for (idx, option) in options.iter().enumerate() {
            writeln!(self.output, "  [{}] {}", idx + 1, option.bright_white())?;
        }

        loop {
            write!(self.output, "Your choice [{}]: ", default + 1)?;
            let answer = self.read_line()?;

            if answer.is_empty() {
                return Ok(default);
            }

            match answer.parse::<usize>() {
                Ok(n) if n >= 1 && n <= options.len() => return Ok(n - 1),
                _ => writeln!(
                    self.output,
                    "{} Enter a number between 1 and {}",
                    "⚠".yellow(),
                    options.len()
                )?,
            }
        }
    }

    pub fn println(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn prompt(input: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_empty_is_none() {
        let mut p = prompt("\n  spaced  \n");

        assert_eq!(p.ask("Email").unwrap(), None);
        assert_eq!(p.ask("Email").unwrap(), Some("spaced".to_string()));
    }

    #[test]
    fn test_confirm_retries_on_garbage() {
        let mut p = prompt("maybe\nYES\n\n");

        assert!(p.confirm("Continue?", false).unwrap());
        assert!(!p.confirm("Continue?", false).unwrap());
    }

    #[test]
    fn test_choose_rejects_out_of_range() {
        let mut p = prompt("0\n4\nx\n3\n");

        let idx = p.choose("Resolver", &["a", "b", "c"], 0).unwrap();
        assert_eq!(idx, 2);

        let out = String::from_utf8(p.output).unwrap();
        assert_eq!(out.matches("Enter a number").count(), 3);
    }

    #[test]
    fn test_choose_empty_line_takes_default() {
        let mut p = prompt("\n\n");

        assert_eq!(p.choose("Resolver", &["a", "b", "c"], 1).unwrap(), 1);
        assert_eq!(p.choose("Resolver", &["a", "b", "c"], 0).unwrap(), 0);

        let out = String::from_utf8(p.output).unwrap();
        assert!(out.contains("Your choice [2]: "));
        assert!(!out.contains("Enter a number"));
    }

    #[test]
    fn test_eof_is_an_error() {
        let mut p = prompt("");

        assert!(p.ask_required("Domain").is_err());
    }
}
