//! Basic processing tests

use super::{at, grf_row, hourly_section, post_row, section_header};
use crate::config::ProcessorConfig;
use crate::models::{ResultKey, SectionStatus, Termination};
use crate::processor::PostProcessor;
use crate::schema::SchemaRegistry;
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;

fn processor(text: String, config: ProcessorConfig) -> PostProcessor<Cursor<String>> {
    PostProcessor::from_reader(Cursor::new(text), config, &SchemaRegistry::new()).unwrap()
}

#[test]
fn test_single_pass_grf_file() {
    let mut text = section_header("24-HR", "HIGH 1ST HIGH", "ALL", 2);
    text.push_str(&grf_row(100.0, 200.0, 5.0, 0.0));
    text.push_str(&grf_row(150.0, 250.0, 9.0, 1.5));

    let mut processor = processor(text, ProcessorConfig::default().with_schema("grf"));
    let stats = processor.process().unwrap();

    assert_eq!(stats.termination, Termination::EndOfFile);
    assert_eq!(stats.sections, 1);
    assert_eq!(stats.blocks_processed, 1);
    assert_eq!(stats.receptors, 2);

    let key = ResultKey::new("24-HR", "HIGH 1ST HIGH", "ALL");
    assert_eq!(processor.result_keys(), &[key.clone()]);

    let table = processor.table(&key).unwrap();
    assert_eq!(table.rank_column(0, 0).unwrap(), vec![5.0, 9.0]);

    let receptors = processor.receptors();
    assert_eq!(receptors.x(), &[100.0, 150.0]);
    assert_eq!(receptors.y(), &[200.0, 250.0]);
    assert_eq!(receptors.z(), &[0.0, 1.5]);
    assert!(processor.timestamps().is_empty());
}

#[test]
fn test_three_hours_single_receptor_top_two() {
    let hours = [at(2019, 1, 1, 0), at(2019, 1, 1, 1), at(2019, 1, 1, 2)];
    let values = [3.0, 7.0, 1.0];
    let text = hourly_section(&[(0.0, 0.0, 0.0)], &hours, |h, _| values[h]);

    let mut processor = processor(text, ProcessorConfig::default().with_top_n(2));
    processor.process().unwrap();

    let key = ResultKey::new("1-HR", "CONCURRENT", "ALL");
    assert_eq!(processor.table(&key).unwrap().ranks(0).unwrap(), &[7.0, 3.0]);
}

#[test]
fn test_hourly_top_two() {
    let receptors = [(0.0, 0.0, 0.0), (50.0, 0.0, 0.0)];
    let hours = [at(2019, 1, 1, 0), at(2019, 1, 1, 1), at(2019, 1, 1, 2)];
    let values = [[1.0, 6.0], [4.0, 2.0], [3.0, 9.0]];
    let text = hourly_section(&receptors, &hours, |h, r| values[h][r]);

    let mut processor = processor(text, ProcessorConfig::default().with_top_n(2));
    let stats = processor.process().unwrap();

    assert!(stats.termination.is_clean());
    assert_eq!(stats.blocks_processed, 3);
    assert_eq!(stats.rows_processed, 6);

    let key = ResultKey::new("1-HR", "CONCURRENT", "ALL");
    let table = processor.table(&key).unwrap();
    assert_eq!(table.ranks(0).unwrap(), &[4.0, 3.0]);
    assert_eq!(table.ranks(1).unwrap(), &[9.0, 6.0]);

    assert_eq!(processor.timestamps(), &hours);
    assert_eq!(processor.sections()[0].blocks, 3);
    assert_eq!(processor.sections()[0].status, SectionStatus::Complete);
}

#[test]
fn test_multiple_sections_and_repeated_keys() {
    let receptors = [(1.0, 1.0, 0.0)];
    let first = hourly_section(&receptors, &[at(2019, 1, 1, 0)], |_, _| 2.0);

    let mut second = section_header("1-HR", "CONCURRENT", "STACK1", 1);
    second.push_str(&post_row(1.0, 1.0, 8.0, 0.0, "19010102"));

    let third = hourly_section(&receptors, &[at(2019, 1, 1, 2)], |_, _| 5.0);

    let mut processor = processor(
        format!("{}{}{}", first, second, third),
        ProcessorConfig::default(),
    );
    let stats = processor.process().unwrap();

    assert_eq!(stats.termination, Termination::EndOfFile);
    assert_eq!(stats.sections, 3);

    let all = ResultKey::new("1-HR", "CONCURRENT", "ALL");
    let stack = ResultKey::new("1-HR", "CONCURRENT", "STACK1");
    assert_eq!(processor.result_keys(), &[all.clone(), stack.clone()]);

    // the repeated key keeps accumulating into one table
    assert_eq!(processor.table(&all).unwrap().ranks(0).unwrap(), &[5.0]);
    assert_eq!(processor.table(&all).unwrap().blocks(), 2);
    assert_eq!(processor.table(&stack).unwrap().ranks(0).unwrap(), &[8.0]);
    assert_eq!(processor.timestamps().len(), 3);
    assert_eq!(processor.tables().count(), 2);
}

#[test]
fn test_receptors_come_from_first_block() {
    let hours = [at(2019, 1, 1, 0), at(2019, 1, 1, 1)];
    let mut text = section_header("1-HR", "CONCURRENT", "ALL", 1);
    text.push_str(&post_row(10.0, 20.0, 1.0, 2.0, &super::stamp_for(hours[0])));
    text.push_str(&post_row(99.0, 99.0, 1.0, 9.0, &super::stamp_for(hours[1])));

    let mut processor = processor(text, ProcessorConfig::default());
    processor.process().unwrap();

    assert_eq!(processor.receptors().get(0), Some((10.0, 20.0, 2.0)));
}

#[test]
fn test_zero_concentrations_fill_ranks() {
    let receptors = [(0.0, 0.0, 0.0)];
    let text = hourly_section(&receptors, &[at(2019, 6, 1, 0)], |_, _| 3.0);

    let mut processor = processor(text, ProcessorConfig::default().with_top_n(3));
    processor.process().unwrap();

    let key = ResultKey::new("1-HR", "CONCURRENT", "ALL");
    assert_eq!(
        processor.table(&key).unwrap().ranks(0).unwrap(),
        &[3.0, 0.0, 0.0]
    );
}

#[test]
fn test_empty_input_is_clean() {
    let mut processor = processor(String::new(), ProcessorConfig::default());
    let stats = processor.process().unwrap();
    assert_eq!(stats.termination, Termination::EndOfFile);
    assert_eq!(stats.sections, 0);
    assert!(processor.result_keys().is_empty());
    assert!(processor.receptors().is_empty());
}

#[test]
fn test_open_reads_file_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("run.pst");
    let receptors = [(0.0, 0.0, 0.0), (1.0, 1.0, 0.0)];
    fs::write(
        &path,
        hourly_section(&receptors, &[at(2020, 3, 1, 5)], |_, r| r as f64),
    )
    .unwrap();

    let mut processor =
        PostProcessor::open(&path, ProcessorConfig::default(), &SchemaRegistry::new()).unwrap();
    let stats = processor.process().unwrap();

    assert_eq!(stats.input_path.as_deref(), Some(path.as_path()));
    assert_eq!(stats.blocks_processed, 1);
    assert!(processor.is_consumed());
    assert_eq!(processor.documentation().len(), 1);
    assert_eq!(processor.documentation()[0].len(), 6);
}
