//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailbridge.
//
// Mailbridge is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbridge is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailbridge. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io::{self, Read};

use super::main::ParseMessageSubcommand;
use crate::mime::message;
use crate::support::sysexits::*;

pub(super) fn parse_message(cmd: ParseMessageSubcommand) {
    let mut raw = Vec::new();
    let read = if "-" == cmd.input.as_os_str() {
        io::stdin().read_to_end(&mut raw)
    } else {
        fs::File::open(&cmd.input).and_then(|mut f| f.read_to_end(&mut raw))
    };

    if let Err(e) = read {
        eprintln!("Error reading '{}': {}", cmd.input.display(), e);
        EX_NOINPUT.exit();
    }

    let record = match message::parse_message(&raw) {
        Ok(record) => record,
        Err(e) => super::main::die(e),
    };

    match serde_json::to_string_pretty(&record) {
        Ok(json) => println!("{}", json),
        Err(e) => super::main::die(e.into()),
    }
}
