// UI module - console front end
//
// This module contains:
// - Command: parsing of one console input line
// - Console: the read-eval loop that confirms, runs and reports operations

pub mod console;

pub use console::{Command, Console};
