//! `issuefold completions`: shell completion scripts.

use std::io::Write;

use clap::Command;
use clap_complete::{Shell, generate};

pub fn run(shell: Shell, command: &mut Command, out: &mut dyn Write) {
    let name = command.get_name().to_string();
    generate(shell, command, name, out);
}
