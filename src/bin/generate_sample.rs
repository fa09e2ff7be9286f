use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::print_batches;
use parquet::arrow::ArrowWriter;

const INSTRUMENTS: [&str; 3] = ["China MGISEQ-2000", "DE MiniSeq", "UK HiSeq 2500"];
const VARIANTS: std::ops::RangeInclusive<u32> = 16..=21;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Percentage in `0..max` with one decimal, or -1 (not measured) with
    /// probability `missing`.
    fn percentage(&mut self, max: f64, missing: f64) -> f64 {
        if self.next_f64() < missing {
            -1.0
        } else {
            (self.next_f64() * max * 10.0).round() / 10.0
        }
    }
}

fn variant_batch(rng: &mut SimpleRng) -> anyhow::Result<RecordBatch> {
    // early shares of a variant stay below 100 in total, late ones smaller
    let early: Vec<f64> = INSTRUMENTS.iter().map(|_| rng.percentage(30.0, 0.15)).collect();
    let late: Vec<f64> = INSTRUMENTS.iter().map(|_| rng.percentage(20.0, 0.15)).collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("instrument", DataType::Utf8, false),
        Field::new("early", DataType::Float64, false),
        Field::new("late", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(INSTRUMENTS.to_vec())),
            Arc::new(Float64Array::from(early)),
            Arc::new(Float64Array::from(late)),
        ],
    )
    .context("building record batch")
}

fn write_csv(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let names = batch.column(0).as_any().downcast_ref::<StringArray>();
    let early = batch.column(1).as_any().downcast_ref::<Float64Array>();
    let late = batch.column(2).as_any().downcast_ref::<Float64Array>();
    let (Some(names), Some(early), Some(late)) = (names, early, late) else {
        anyhow::bail!("unexpected column types");
    };

    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["", "early", "late"])?;
    for row in 0..batch.num_rows() {
        writer.write_record([
            names.value(row).to_string(),
            early.value(row).to_string(),
            late.value(row).to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let out_dir = Path::new(&out_dir);
    let parquet_dir = out_dir.join("parquet");
    fs::create_dir_all(&parquet_dir).with_context(|| format!("creating {}", parquet_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    for variant in VARIANTS {
        let batch = variant_batch(&mut rng)?;
        let stem = format!("early_late_var{variant}");
        write_csv(&out_dir.join(format!("{stem}.csv")), &batch)?;
        write_parquet(&parquet_dir.join(format!("{stem}.parquet")), &batch)?;

        println!("Variant {variant}");
        print_batches(&[batch])?;
    }

    println!("{}", summary(out_dir, &parquet_dir));
    Ok(())
}

fn summary(out_dir: &Path, parquet_dir: &Path) -> String {
    format!(
        "Wrote {} variant tables to {} (Parquet copies in {}).\n\
         `render -d {}` works as is; `compare` also needs a workbook \
         (early_late_groups_3_locations.xlsx) in that directory.",
        VARIANTS.count(),
        out_dir.display(),
        parquet_dir.display(),
        out_dir.display()
    )
}
