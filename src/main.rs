use log::error;
use std::fs::File;
use std::path::Path;

use registrar::{load_check_ins, Registrar, Result};

const INPUT_FILE: &str = "attendance.csv";
const ABSENTEE_FILE: &str = "attendance_absentees.csv";
const PERCENTAGE_FILE: &str = "attendance_percentage.csv";

fn run() -> Result<()> {
    let (check_ins, roster) = load_check_ins(Path::new(INPUT_FILE))?;

    let mut registrar = Registrar::new(roster);
    registrar.consume(check_ins.into_iter())?;

    println!("Date-wise absentee count and breakdown:");
    for row in registrar.absentee_rows() {
        println!("{}: {} absent", row.date, row.count());
    }
    registrar.write_absentees(File::create(ABSENTEE_FILE)?)?;
    println!("\nAbsentee report written to {ABSENTEE_FILE}");

    registrar.write_percentages(File::create(PERCENTAGE_FILE)?)?;
    println!("Attendance percentage report written to {PERCENTAGE_FILE}");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}
