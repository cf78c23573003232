use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

use codesim::{
    classify_files, fscore_sweep, reorder_by_group, Codec, Compressor, Dataset, Formula, Scheme,
    SimilarityEngine, Tally,
};

const DATASET_PATH: &str = "runner/files/Project_CodeNet_Java250";
const NUM_GROUPS: usize = 5;
const FILES_PER_GROUP: usize = 20;
const CLASSIFY_PER_GROUP: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dataset = Dataset::load_partitioned(
        DATASET_PATH,
        NUM_GROUPS,
        FILES_PER_GROUP,
        CLASSIFY_PER_GROUP,
    )?;
    let codecs = [Codec::Bzip2, Codec::Gzip, Codec::Zlib, Codec::Zstd];
    let schemes = [Scheme::BestMatch, Scheme::HighestAverage, Scheme::Knn(10)];
    let thresholds: Vec<f64> = (1..10).map(|t| t as f64 / 10.0).collect();

    let mut fscores_out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open("out-fscores.csv")?;
    writeln!(fscores_out, "Tool\tThreshold\tPrecision\tRecall\tF1")?;

    let mut tally = Tally::new();
    for codec in codecs {
        let engine = SimilarityEngine::new(Compressor::with_default_level(codec));

        let now = Instant::now();
        let matrix = engine.matrix(dataset.reference_files(), Formula::Ncd)?;
        log::info!(
            "{}: {}x{} matrix in {:?}",
            engine.tool_label(Formula::Ncd),
            matrix.len(),
            matrix.len(),
            now.elapsed()
        );

        let (clustered, _) = reorder_by_group(&matrix, &dataset.group_ids())?;
        for (threshold, score) in fscore_sweep(&clustered, FILES_PER_GROUP, &thresholds)? {
            writeln!(
                fscores_out,
                "{}\t{:.1}\t{:.4}\t{:.4}\t{:.4}",
                engine.tool_label(Formula::Ncd),
                threshold,
                score.precision,
                score.recall,
                score.f1
            )?;
        }

        let now = Instant::now();
        for scheme in schemes {
            classify_files(
                scheme,
                &engine,
                dataset.classification_files(),
                dataset.reference_files(),
                &mut tally,
            )?;
        }
        log::info!(
            "classified {} files with {} in {:?}",
            dataset.classification_files().len(),
            codec.name(),
            now.elapsed()
        );
    }

    let mut classification_out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open("out-classification.csv")?;
    writeln!(classification_out, "Scheme\tCompressor\tAccuracy")?;
    for scheme in schemes {
        for codec in codecs {
            if let Some(accuracy) = tally.accuracy(scheme, codec) {
                writeln!(
                    classification_out,
                    "{}\t{}\t{:.4}",
                    scheme.label(),
                    codec.name(),
                    accuracy
                )?;
            }
        }
    }

    Ok(())
}
