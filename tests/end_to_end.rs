//! End-to-end runs over dataset files on disk

use datacrunch::config::toml::parse_toml_string;
use datacrunch::config::Config;
use datacrunch::distributed::local::run_local;
use datacrunch::ingest::{ingest, ingest_all, DatasetId};
use datacrunch::pipeline::crunch;
use datacrunch::sort::{ParallelSorter, RayonScheduler};
use datacrunch::stats::{PercentileMode, StatsOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write `<size>.txt` holding a shuffled permutation of 1..=size
fn write_dataset(dir: &Path, size: u64) {
    let mut file = std::fs::File::create(dir.join(format!("{}.txt", size))).unwrap();
    for i in 0..size {
        let value = (i * 7919) % size + 1;
        if i % 10 == 9 {
            writeln!(file, "{}.5", value).unwrap();
        } else {
            write!(file, "{}.5 ", value).unwrap();
        }
    }
}

fn config_for(dir: &Path, sizes: &[u64]) -> Config {
    let mut config = Config::default();
    config.datasets.input_dir = dir.to_path_buf();
    config.datasets.sizes = sizes.to_vec();
    config.sort.threads = 2;
    config
}

#[test]
fn test_ingest_sort_summarize_keeps_size() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 1001);

    let mut values = ingest(dir.path(), DatasetId(1001)).unwrap();
    let sorter = ParallelSorter::new(RayonScheduler::new(4).unwrap());
    let report = crunch(&mut values, &sorter, &StatsOptions::default()).unwrap();

    assert_eq!(report.size, 1001);
    assert_eq!(report.min, 1.5);
    assert_eq!(report.max, 1001.5);
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    // index 1001/2 + 1 = 501 holds 502.5
    assert_eq!(report.median, 502.5);
    // floor(0.95 * 1000) = 950 holds 951.5
    assert_eq!(report.p95, 951.5);
}

#[test]
fn test_legacy_percentile_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 97);

    let mut values = ingest(dir.path(), DatasetId(97)).unwrap();
    let sorter = ParallelSorter::new(RayonScheduler::new(2).unwrap());
    let options = StatsOptions {
        percentile: PercentileMode::Legacy,
        ..Default::default()
    };
    let report = crunch(&mut values, &sorter, &options).unwrap();

    assert_eq!(report.size, 97);
    assert_eq!(report.p95, report.min);
}

#[test]
fn test_missing_dataset_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 10);

    let result = ingest_all(dir.path(), &[DatasetId(10), DatasetId(11)]);
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_mode_end_to_end() {
    let dir = TempDir::new().unwrap();
    let sizes = [300u64, 500, 700];
    for &size in &sizes {
        write_dataset(dir.path(), size);
    }

    let config = Arc::new(config_for(dir.path(), &sizes));
    let summary = run_local(config, 3).await.unwrap();

    assert!(summary.is_success());
    let reports: Vec<_> = summary.reports().collect();
    assert_eq!(reports.len(), 3);
    for (report, &size) in reports.iter().zip(sizes.iter()) {
        assert_eq!(report.dataset, DatasetId(size));
        assert_eq!(report.summary.size, size as usize);
        assert_eq!(report.summary.min, 1.5);
        assert_eq!(report.summary.max, size as f64 + 0.5);
    }
}

#[tokio::test]
async fn test_local_mode_with_more_workers_than_datasets() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 50);

    let config = Arc::new(config_for(dir.path(), &[50]));
    let err = run_local(config, 2).await.unwrap_err();
    assert!(err.to_string().contains("every worker needs its own dataset"));
}

#[test]
fn test_config_file_drives_dataset_list() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 20);
    write_dataset(dir.path(), 30);

    let toml = format!(
        "[datasets]\ninput_dir = {:?}\nsizes = [30, 20]\n\n[stats]\npercentile = \"legacy\"\n",
        dir.path().display().to_string()
    );
    let config = parse_toml_string(&toml).unwrap();
    let ids = config.datasets.ids();
    assert_eq!(ids, vec![DatasetId(30), DatasetId(20)]);

    let datasets = ingest_all(&config.datasets.input_dir, &ids).unwrap();
    assert_eq!(datasets[&DatasetId(20)].len(), 20);
    assert_eq!(datasets[&DatasetId(30)].len(), 30);
}
