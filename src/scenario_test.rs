use crate::background::ThresholdModel;
use crate::correlate::kmer_pearson;
use crate::kmer::KmerSpace;
use crate::normalize::ReferenceStats;
use crate::pipeline::global_stats::{self, GlobalStatsArgs};
use crate::pipeline::scan::{self, ScanArgs};
use crate::pipeline::InputArgs;
use crate::tile::tile_seq;
use std::env::temp_dir;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MOTIF: &str = "ACGGTTCA";

/// Deterministic pseudo-random DNA (top bits of a 64-bit LCG).
fn pseudo_random_seq(seed: u64, len: usize) -> String {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize] as char
        })
        .collect()
}

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = temp_dir().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn fasta(&self, name: &str, records: &[(&str, String)]) -> PathBuf {
        let path = self.dir.join(name);
        let mut text = String::new();
        for (id, seq) in records {
            text.push_str(&format!(">{id}\n{seq}\n"));
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn reference_records() -> Vec<(&'static str, String)> {
    const IDS: [&str; 20] = [
        "ref01", "ref02", "ref03", "ref04", "ref05", "ref06", "ref07", "ref08", "ref09", "ref10",
        "ref11", "ref12", "ref13", "ref14", "ref15", "ref16", "ref17", "ref18", "ref19", "ref20",
    ];
    IDS.iter()
        .enumerate()
        .map(|(i, id)| (*id, pseudo_random_seq(i as u64 + 1, 300)))
        .collect()
}

fn query_records() -> Vec<(&'static str, String)> {
    vec![
        ("repeatB", pseudo_random_seq(99, 160)),
        ("repeatA", MOTIF.repeat(20)),
    ]
}

fn transcript_records() -> Vec<(&'static str, String)> {
    vec![
        ("tx_motif", MOTIF.repeat(30)),
        ("tx_empty", String::new()),
        ("tx_random", pseudo_random_seq(12345, 240)),
    ]
}

fn input_args(ws: &Workspace) -> InputArgs {
    InputArgs {
        queries: ws.fasta("queries.fa", &query_records()),
        reference: Some(ws.fasta("reference.fa", &reference_records())),
        ref_stats: None,
        background: None,
        save_ref_stats: None,
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[test]
fn test_motif_tiles_track_motif_query() {
    let space = KmerSpace::build(3).unwrap();
    let reference: Vec<String> = reference_records().into_iter().map(|(_, s)| s).collect();
    let stats = ReferenceStats::from_sequences(&space, &reference).unwrap();
    assert!(stats.sd().iter().all(|&s| s > 0.0));

    let query = stats.target_norm_one(&space, MOTIF.repeat(20).as_bytes()).unwrap();
    let background_profiles = stats.target_norm(&space, &reference).unwrap();
    let background = kmer_pearson(query.view(), background_profiles.view()).unwrap();
    let threshold = ThresholdModel::from_background(background.view(), 2.0).unwrap();

    let seq = MOTIF.repeat(30);
    let tiles = tile_seq(seq.as_bytes(), 80, 40).unwrap();
    let tile_seqs: Vec<&[u8]> = tiles.iter().map(|t| t.seq.as_slice()).collect();
    let profiles = stats.target_norm(&space, &tile_seqs).unwrap();
    let r = kmer_pearson(query.view(), profiles.view()).unwrap();

    assert_eq!(r.len(), tiles.len());
    assert!(r.iter().all(|&v| v > 0.9), "motif tiles: {r:?}");
    assert_eq!(threshold.hit_rate(r.view()), 1.0);
}

#[test]
fn test_global_stats_end_to_end() {
    let ws = Workspace::new();
    let args = GlobalStatsArgs {
        transcripts: ws.fasta("transcripts.fa", &transcript_records()),
        inputs: input_args(&ws),
        output: ws.path("scores"),
        k: vec![3],
        tile_length: 80,
        tile_stride: 40,
        k_sigma: 2.0,
    };
    global_stats::run(&args).unwrap();

    let rows = read_rows(&ws.path("scores_3mers_2sd.csv"));
    assert_eq!(rows[0], vec!["transcript", "repeatA", "repeatB"]);
    let ids: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["tx_motif", "tx_empty", "tx_random"]);

    let motif_rate: f64 = rows[1][1].parse().unwrap();
    assert_eq!(motif_rate, 1.0);
    assert_eq!(rows[2][1..], ["nan".to_string(), "nan".to_string()]);
    for value in &rows[3][1..] {
        let rate: f64 = value.parse().unwrap();
        assert!((0.0..=1.0).contains(&rate));
    }
}

#[test]
fn test_saved_reference_stats_reproduce_scores() {
    let ws = Workspace::new();
    let transcripts = ws.fasta("transcripts.fa", &transcript_records());
    let fitted = GlobalStatsArgs {
        transcripts: transcripts.clone(),
        inputs: InputArgs {
            save_ref_stats: Some(ws.path("ref")),
            ..input_args(&ws)
        },
        output: ws.path("fitted"),
        k: vec![2, 3],
        tile_length: 60,
        tile_stride: 30,
        k_sigma: 1.5,
    };
    global_stats::run(&fitted).unwrap();
    assert!(ws.path("ref_2mers_refstats.csv").exists());
    assert!(ws.path("ref_3mers_refstats.csv").exists());

    let inputs = input_args(&ws);
    let loaded = GlobalStatsArgs {
        inputs: InputArgs {
            ref_stats: Some(ws.path("ref")),
            background: inputs.reference.clone(),
            reference: None,
            ..inputs
        },
        output: ws.path("loaded"),
        ..fitted
    };
    global_stats::run(&loaded).unwrap();

    for k in [2, 3] {
        let a = fs::read_to_string(ws.path(&format!("fitted_{k}mers_1.5sd.csv"))).unwrap();
        let b = fs::read_to_string(ws.path(&format!("loaded_{k}mers_1.5sd.csv"))).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_scan_end_to_end() {
    let ws = Workspace::new();
    let out_dir = ws.path("scan");
    fs::create_dir_all(&out_dir).unwrap();
    let seq = format!("{}{}", pseudo_random_seq(7, 200), MOTIF.repeat(25));
    let args = ScanArgs {
        fasta: ws.fasta("input.fa", &[("lnc1", seq.clone())]),
        inputs: input_args(&ws),
        output_dir: out_dir.clone(),
        k: 3,
        window: 100,
        stride: 50,
        k_sigma: 3.0,
    };
    scan::run(&args).unwrap();

    let raw = read_rows(&out_dir.join("lnc1_scan.csv"));
    let percentiles = read_rows(&out_dir.join("lnc1_percentile.csv"));
    let expected_windows = (0..seq.len()).step_by(50).count();
    assert_eq!(raw.len(), expected_windows + 1);
    assert_eq!(percentiles.len(), expected_windows + 1);
    assert_eq!(raw[0], vec!["start", "repeatA", "repeatB"]);
    assert_eq!(raw[1][0], "0");
    assert_eq!(raw[2][0], "50");

    for row in &percentiles[1..] {
        for value in &row[1..] {
            let p: f64 = value.parse().unwrap();
            assert!((0.0..=100.0).contains(&p));
        }
    }
    // full-length windows inside the motif repeat outrank the whole background
    let motif_window = percentiles
        .iter()
        .skip(1)
        .find(|row| row[0] == "300")
        .unwrap();
    assert_eq!(motif_window[1], "100");
}

#[test]
fn test_scan_keeps_colliding_ids_apart() {
    let ws = Workspace::new();
    let out_dir = ws.path("scan");
    fs::create_dir_all(&out_dir).unwrap();
    let args = ScanArgs {
        fasta: ws.fasta(
            "input.fa",
            &[("lnc|1", MOTIF.repeat(20)), ("lnc:1", pseudo_random_seq(3, 300))],
        ),
        inputs: input_args(&ws),
        output_dir: out_dir.clone(),
        k: 3,
        window: 100,
        stride: 100,
        k_sigma: 3.0,
    };
    scan::run(&args).unwrap();

    let first = read_rows(&out_dir.join("lnc_1_scan.csv"));
    let second = read_rows(&out_dir.join("lnc_1_2_scan.csv"));
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 4);
    assert!(out_dir.join("lnc_1_2_percentile.csv").exists());
}
