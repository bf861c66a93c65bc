use std::io::{self, BufRead, Write};

use colored::*;
use parley::{Execution, Host, Program, RunState, View, VM};
use tracing::debug;

use crate::cli::status::Status;

/// Markup the compiler passes through for bold and italic text.
const MARKERS: [&str; 4] = ["<b>", "</b>", "<i>", "</i>"];

/// Plays dialogue on stdout.
pub struct Terminal;

impl Host for Terminal {
    fn enter_node(&mut self, _vm: &View, node: &str) -> Execution {
        debug!(node, "entered node");
        Execution::Continue
    }

    fn show_line(&mut self, _vm: &View, line: &str) -> Execution {
        println!("{}\n", render(line));
        Execution::Continue
    }

    fn show_choice(&mut self, _vm: &View, choices: &[String]) {
        for (number, choice) in choices.iter().enumerate() {
            println!("  {}. {}", (number + 1).to_string().bold(), render(choice));
        }
    }

    fn end_dialogue(&mut self, _vm: &View) {
        debug!("dialogue ended");
    }
}

/// Styles a line, replacing bold and italic markup with terminal escapes.
pub fn render(line: &str) -> String {
    let mut out = String::new();
    let (mut bold, mut italic) = (false, false);
    let mut rest = line;

    loop {
        let next = MARKERS
            .iter()
            .filter_map(|marker| rest.find(marker).map(|index| (index, *marker)))
            .min_by_key(|(index, _)| *index);

        let (text, marker) = match next {
            Some((index, marker)) => (&rest[..index], Some(marker)),
            None => (rest, None),
        };

        let mut styled = text.normal();
        if bold {
            styled = styled.bold();
        }
        if italic {
            styled = styled.italic();
        }
        out.push_str(&styled.to_string());

        let marker = match marker {
            Some(marker) => marker,
            None => break,
        };
        match marker {
            "<b>" => bold = true,
            "</b>" => bold = false,
            "<i>" => italic = true,
            _ => italic = false,
        }
        rest = &rest[text.len() + marker.len()..];
    }

    out
}

/// Asks for a choice until a valid one is given.
/// Returns `None` once input runs out.
fn prompt(input: &mut impl BufRead, count: usize) -> Result<Option<usize>, String> {
    loop {
        print!("{} ", ">".bold());
        io::stdout().flush().map_err(|e| e.to_string())?;

        let mut answer = String::new();
        if input.read_line(&mut answer).map_err(|e| e.to_string())? == 0 {
            return Ok(None);
        }

        match answer.trim().parse::<usize>() {
            Ok(number) if (1..=count).contains(&number) => return Ok(Some(number - 1)),
            _ => Status::info().log(&format!("Pick a number from 1 to {}", count)),
        }
    }
}

/// Runs a program to completion, reading choices from stdin.
pub fn play(program: Program) -> Result<(), String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut vm = VM::init(program, Terminal);
    let mut state = vm.run().map_err(|e| e.to_string())?;

    loop {
        let next = match state {
            RunState::WaitingForInput => match prompt(&mut input, vm.choices().len())? {
                Some(index) => vm.choose(index),
                None => return Ok(()),
            },
            RunState::Suspended => vm.resume(),
            _ => return Ok(()),
        };

        state = next.map_err(|e| e.to_string())?;
    }
}
