//! End-to-end batch tests: CSV on disk → ZIP on disk.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use edificio_core::pipeline::{build_documents, process_csv, process_table, BatchOptions};
use edificio_core::{parse_csv_bytes, FixedClock, GeradorError};
use tempfile::TempDir;
use zip::ZipArchive;

const HEADER: &str = "COD_SURVEY;LATITUDE;LONGITUDE;LOGRADOURO;BAIRRO;MUNICIPIO;LOCALIDADE;UF;COD_LOGRADOURO;COMPLEMENTO;COMPLEMENTO2;RESULTADO;ESTACAO_ABASTECEDORA";

fn csv_with_rows(n: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 1..=n {
        csv.push_str(&format!(
            "SV-{i};-15,8{i};-47,9{i};QE {i};GUARA II;BRASILIA;GUARA;DF;27000{i};QU {i};LT {i};CA {i};ETGR\n"
        ));
    }
    csv
}

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap(),
    )
}

fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}

struct Workspace {
    _root: TempDir,
    input: std::path::PathBuf,
    out: std::path::PathBuf,
    staging: std::path::PathBuf,
}

fn workspace(csv: &str) -> Workspace {
    let root = TempDir::new().unwrap();
    let input = root.path().join("cto.csv");
    fs::write(&input, csv).unwrap();
    let out = root.path().join("downloads");
    let staging = root.path().join("staging");
    fs::create_dir(&staging).unwrap();
    Workspace {
        input,
        out,
        staging,
        _root: root,
    }
}

#[test]
fn test_five_rows_produce_five_entries() {
    let ws = workspace(&csv_with_rows(5));
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let report = process_csv(&ws.input, &options).unwrap();

    assert_eq!(report.row_count, 5);
    assert!(report.archive_name.starts_with("moradias_xml_ETGR_"));
    assert!(report.archive_name.ends_with(".zip"));
    assert_eq!(report.archive_path, ws.out.join(&report.archive_name));

    let mut zip = ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
    let names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(
        names,
        (1..=5)
            .map(|i| format!("moradia{i}/moradia{i}.xml"))
            .collect::<Vec<_>>()
    );

    let mut third = String::new();
    zip.by_name("moradia3/moradia3.xml")
        .unwrap()
        .read_to_string(&mut third)
        .unwrap();
    assert!(third.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?><edificio tipo="M" versao="7.9.2">"#));
    assert!(third.contains("<nEdificio>SV-3</nEdificio>"));
    assert!(third.contains("<id_complemento1>85</id_complemento1><argumento1>3</argumento1>"));
    assert!(third.contains("<destinacao>RESIDENCIA</destinacao>"));

    assert!(dir_is_empty(&ws.staging));
}

#[test]
fn test_archive_name_uses_frozen_clock() {
    let table = parse_csv_bytes(csv_with_rows(2).as_bytes()).unwrap();
    let ws = workspace("");
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let report = process_table(&table, &options, &clock()).unwrap();

    assert_eq!(report.archive_name, "moradias_xml_ETGR_20240506070809.zip");
    assert!(report.archive_path.exists());
}

fn read_entry(path: &Path, index: usize) -> String {
    let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut xml = String::new();
    zip.by_index(index).unwrap().read_to_string(&mut xml).unwrap();
    xml
}

#[test]
fn test_same_second_batches_keep_separate_archives() {
    let user_a = format!("{HEADER}\nUSER-A;-15;-47;QE 1;GUARA II;BRASILIA;GUARA;DF;1;;;;ETGR\n");
    let user_b = format!("{HEADER}\nUSER-B;-15;-47;QE 2;GUARA II;BRASILIA;GUARA;DF;2;;;;ETGR\n");
    let ws = workspace("");
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let a = process_table(&parse_csv_bytes(user_a.as_bytes()).unwrap(), &options, &clock()).unwrap();
    let b = process_table(&parse_csv_bytes(user_b.as_bytes()).unwrap(), &options, &clock()).unwrap();

    assert_eq!(a.archive_name, "moradias_xml_ETGR_20240506070809.zip");
    assert_eq!(b.archive_name, "moradias_xml_ETGR_20240506070809_2.zip");
    let xml_a = read_entry(&a.archive_path, 0);
    let xml_b = read_entry(&b.archive_path, 0);
    assert!(xml_a.contains("<nEdificio>USER-A</nEdificio>"));
    assert!(!xml_a.contains("USER-B"));
    assert!(xml_b.contains("<nEdificio>USER-B</nEdificio>"));
    assert!(dir_is_empty(&ws.staging));
}

#[test]
fn test_missing_station_column_uses_placeholder() {
    let csv = "COD_SURVEY;LOGRADOURO;BAIRRO;MUNICIPIO;LOCALIDADE;UF;COD_LOGRADOURO\nS1;QE 1;B;M;L;DF;1\n";
    let table = parse_csv_bytes(csv.as_bytes()).unwrap();
    let built = build_documents(&table, &clock()).unwrap();
    assert_eq!(built.station, "DESCONHECIDA");
}

#[test]
fn test_log_covers_first_and_every_tenth_row() {
    let table = parse_csv_bytes(csv_with_rows(25).as_bytes()).unwrap();
    let ws = workspace("");
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let report = process_table(&table, &options, &clock()).unwrap();

    let headers: Vec<&str> = report
        .log
        .lines()
        .filter(|line| line.starts_with("Registro "))
        .collect();
    assert_eq!(headers, vec!["Registro 1:", "Registro 10:", "Registro 20:"]);
    assert_eq!(report.log.lines().count(), 15);
    assert!(report
        .log
        .contains("  COMP1(\"QU 10\" → código:85 argumento:\"10\")"));
    assert!(!report.log.ends_with('\n'));
}

#[test]
fn test_missing_building_id_leaves_no_files() {
    let mut csv = csv_with_rows(3);
    csv.push_str(";-15;-47;QE 9;GUARA II;BRASILIA;GUARA;DF;1;;;;ETGR\n");
    let ws = workspace(&csv);
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let err = process_csv(&ws.input, &options).unwrap_err();

    assert!(matches!(
        err,
        GeradorError::MissingRequiredField {
            row: 4,
            column: "COD_SURVEY"
        }
    ));
    assert!(!ws.out.exists() || dir_is_empty(&ws.out));
    assert!(dir_is_empty(&ws.staging));
}

#[test]
fn test_header_only_file_is_empty_input() {
    let ws = workspace(&format!("{HEADER}\n"));
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);
    let err = process_csv(&ws.input, &options).unwrap_err();
    assert!(matches!(err, GeradorError::EmptyInput));
    assert_eq!(err.user_message(), "O arquivo CSV está vazio");
}

#[test]
fn test_latin1_file_is_processed() {
    let mut bytes = HEADER.as_bytes().to_vec();
    bytes.extend_from_slice(b"\nS1;;;RUA S\xC3O JO\xC3O;GUAR\xC1;BRAS\xCDLIA;GUARA;DF;1;;;;ETGR\n");
    let ws = workspace("");
    fs::write(&ws.input, bytes).unwrap();
    let options = BatchOptions::new(&ws.out).with_staging_dir(&ws.staging);

    let report = process_csv(&ws.input, &options).unwrap();

    let mut zip = ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
    let mut xml = String::new();
    zip.by_index(0).unwrap().read_to_string(&mut xml).unwrap();
    assert!(xml.contains("<logradouro>RUA SÃO JOÃO, GUARÁ, BRASÍLIA, GUARA - DF (1)</logradouro>"));
    assert!(xml.contains("<coordX></coordX><coordY></coordY>"));
}

#[test]
fn test_dry_run_is_deterministic_under_fixed_clock() {
    let table = parse_csv_bytes(csv_with_rows(4).as_bytes()).unwrap();
    let a = build_documents(&table, &clock()).unwrap();
    let b = build_documents(&table, &clock()).unwrap();
    assert_eq!(a.documents, b.documents);
    assert_eq!(a.documents.len(), 4);
    assert_eq!(
        a.documents.iter().map(|d| d.index).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}
