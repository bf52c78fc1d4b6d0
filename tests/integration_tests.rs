use registrar::{load_check_ins_from, CheckIn, Registrar};

fn registrar_from_csv(input: &str) -> Registrar {
    let (check_ins, roster) =
        load_check_ins_from(csv::Reader::from_reader(input.as_bytes())).unwrap();
    let mut registrar = Registrar::new(roster);
    registrar.consume(check_ins.into_iter()).unwrap();
    registrar
}

#[test]
fn end_to_end_reports() {
    let registrar = registrar_from_csv(
        "Timestamp,Name\n\
         17/04/2025 08:00:00,Alice\n\
         17/04/2025 08:05:00,Bob\n\
         18/04/2025 08:00:00,Alice\n",
    );

    let mut absentees = Vec::new();
    registrar.write_absentees(&mut absentees).unwrap();
    assert_eq!(
        absentees,
        b"Date,Number Absent,Absentees\n2025-04-17,0,\n2025-04-18,1,Bob\n"
    );

    let mut percentages = Vec::new();
    registrar.write_percentages(&mut percentages).unwrap();
    assert_eq!(
        percentages,
        b"Name,Days Present,Total Days,Attendance Percentage\nAlice,2,2,100.00%\nBob,1,2,50.00%\n"
    );
}

#[test]
fn multiple_absentees_are_joined_and_quoted() {
    let registrar = registrar_from_csv(
        "Timestamp,Name\n\
         17/04/2025 08:00:00,Alice\n\
         17/04/2025 08:05:00,Bob\n\
         18/04/2025 08:00:00,Carol\n",
    );

    let mut output = Vec::new();
    registrar.write_absentees(&mut output).unwrap();
    assert_eq!(
        output,
        b"Date,Number Absent,Absentees\n2025-04-17,1,Carol\n2025-04-18,2,\"Alice, Bob\"\n"
    );
}

#[test]
fn empty_input_yields_header_only_reports() {
    let registrar = registrar_from_csv("Timestamp,Name\n");

    let mut absentees = Vec::new();
    registrar.write_absentees(&mut absentees).unwrap();
    assert_eq!(absentees, b"Date,Number Absent,Absentees\n");

    let mut percentages = Vec::new();
    registrar.write_percentages(&mut percentages).unwrap();
    assert_eq!(
        percentages,
        b"Name,Days Present,Total Days,Attendance Percentage\n"
    );
}

#[test]
fn date_only_fallback_flows_through_to_the_report() {
    let registrar = registrar_from_csv("Timestamp,Name\n17/04/2025,Alice\n");

    let mut output = Vec::new();
    registrar.write_absentees(&mut output).unwrap();
    assert_eq!(output, b"Date,Number Absent,Absentees\n2025-04-17,0,\n");
}

#[test]
fn reports_are_deterministic_across_runs() {
    let input = "Timestamp,Name\n\
                 18/04/2025 08:00:00,Bob\n\
                 17/04/2025 08:00:00,Alice\n\
                 17/04/2025 09:00:00,Alice\n";

    let mut first = Vec::new();
    registrar_from_csv(input)
        .write_percentages(&mut first)
        .unwrap();
    let mut second = Vec::new();
    registrar_from_csv(input)
        .write_percentages(&mut second)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn consume_rejects_unparseable_timestamps() {
    let (check_ins, roster) = load_check_ins_from(csv::Reader::from_reader(
        &b"Timestamp,Name\nnot a date,Alice\n"[..],
    ))
    .unwrap();

    let mut registrar = Registrar::new(roster);
    assert!(registrar.consume(check_ins.into_iter()).is_err());
}

#[test]
fn duplicate_check_ins_do_not_inflate_percentages() {
    let registrar = registrar_from_csv(
        "Timestamp,Name\n\
         17/04/2025 08:00:00,Alice\n\
         17/04/2025 12:00:00,Alice\n\
         18/04/2025 08:00:00,Bob\n",
    );

    let mut output = Vec::new();
    registrar.write_percentages(&mut output).unwrap();
    assert_eq!(
        output,
        b"Name,Days Present,Total Days,Attendance Percentage\nAlice,1,2,50.00%\nBob,1,2,50.00%\n"
    );
}

#[test]
fn check_ins_can_be_fed_directly() {
    let mut registrar = Registrar::new(
        ["Alice".to_string(), "Bob".to_string()]
            .into_iter()
            .collect(),
    );
    registrar
        .consume(
            vec![
                CheckIn::new("17/04/2025 08:00:00", "Alice"),
                CheckIn::new("17/04/2025 08:05:00", "Bob"),
            ]
            .into_iter(),
        )
        .unwrap();

    assert_eq!(registrar.total_days(), 1);
    assert!(registrar.absentee_rows()[0].absent.is_empty());
}
