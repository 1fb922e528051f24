use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;
use w2_processor::config::ReadConfig;
use w2_processor::parser::numeric::parse_number;
use w2_processor::{FormatDescriptor, read_with_config};

const COLUMNS: usize = 6;

fn descriptor() -> FormatDescriptor {
    let row = |cells: [&str; 7]| {
        format!(
            "{:<30}{:<10}{:<8}{:<8}{:<8}{:<6}{}",
            cells[0], cells[1], cells[2], cells[3], cells[4], cells[5], cells[6]
        )
    };
    let header = ["........CONSTITUENT NAME", "FORMAT", "MULT", "MIN", "MAX", "PLOT", "SEQ"];
    let mut lines = vec![row(header)];
    for i in 0..COLUMNS {
        let name = format!("Constituent {i}, g/m3");
        lines.push(row([&name, "(f10.3)", "1.0", "0.0", "10.0", "ON", "1"]));
    }
    FormatDescriptor::parse_str(&lines.join("\n")).expect("descriptor")
}

/// Fixed-width output file with `rows` hourly records
fn write_output(dir: &TempDir, rows: usize) -> PathBuf {
    let mut content = String::from("$ benchmark output\n\n    JDAY");
    for i in 0..COLUMNS {
        content.push_str(&format!("{:>10}", format!("C{i}")));
    }
    content.push('\n');
    for r in 0..rows {
        content.push_str(&format!("{:8.4}", 1.0 + r as f64 / 24.0));
        for c in 0..COLUMNS {
            // Every seventh value uses the legacy exponent spelling.
            if (r + c) % 7 == 0 {
                content.push_str(&format!("{:>10}", "1.25D-2"));
            } else {
                content.push_str(&format!("{:10.3}", (r * c) as f64 / 100.0));
            }
        }
        content.push('\n');
    }
    let path = dir.path().join(format!("cwo_{rows}.opt"));
    fs::write(&path, content).expect("write output");
    path
}

fn bench_fixed_width_read(c: &mut Criterion) {
    let dir = TempDir::new().expect("tempdir");
    let descriptor = descriptor();
    let config = ReadConfig::default().with_reference_year(2010);

    let mut group = c.benchmark_group("fixed_width_read");
    for &rows in &[100usize, 1_000, 10_000] {
        let path = write_output(&dir, rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &path, |b, path| {
            b.iter(|| {
                let result = read_with_config(path, Some(&descriptor), &config).expect("read");
                black_box(result.table.row_count())
            })
        });
    }
    group.finish();
}

fn bench_legacy_numbers(c: &mut Criterion) {
    let samples = ["12.345", ".5E-3", "1.2D-3", "2-4", "-0.125", "1.0e+10", "abc"];
    c.bench_function("parse_number", |b| {
        b.iter(|| {
            for sample in &samples {
                black_box(parse_number(black_box(sample)));
            }
        })
    });
}

criterion_group!(benches, bench_fixed_width_read, bench_legacy_numbers);
criterion_main!(benches);
