use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tabula::{DataType, Expr, Predicate, RangeFlags, Table, Tuple};

fn setup_populated_table(n: usize) -> (Table, Vec<Tuple>) {
    let mut table = Table::new();
    table.add_column("id", DataType::Int).unwrap();
    table.add_column("weight", DataType::Double).unwrap();
    table.add_column("active", DataType::Bool).unwrap();
    let tuples = table.add_rows(n);
    for (i, tuple) in tuples.iter().enumerate() {
        table.set_int(*tuple, "id", (i % 100) as i32).unwrap();
        table
            .set_double(*tuple, "weight", (i as f64) * 0.25)
            .unwrap();
        table.set_bool(*tuple, "active", i % 2 == 0).unwrap();
    }
    (table, tuples)
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("Append_Rows");
    group.bench_function("add_row_and_set", |b| {
        let mut table = Table::new();
        table.add_column("id", DataType::Int).unwrap();
        let mut i = 0;
        b.iter(|| {
            let tuple = table.add_row();
            table.set_int(tuple, "id", black_box(i)).unwrap();
            i += 1;
        });
    });
    group.finish();
}

fn bench_filtered_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("Predicate_Filter");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let (table, _tuples) = setup_populated_table(n);
            let predicate = Predicate::from(Expr::col("id").gt(Expr::lit(42)));
            b.iter(|| {
                let hits = table.tuples_where(black_box(&predicate)).unwrap();
                black_box(hits.len());
            });
        });
    }
    group.finish();
}

fn bench_index_range_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("Index_Range_Query");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let (mut table, _tuples) = setup_populated_table(n);
            table.create_index("id").unwrap();
            // force the initial build outside the measurement
            table.index("id").unwrap();
            b.iter(|| {
                let index = table.index("id").unwrap();
                let rows: usize = index
                    .rows_int(black_box(25), black_box(75), RangeFlags::ascending())
                    .unwrap()
                    .count();
                black_box(rows);
            });
        });
    }
    group.finish();
}

fn bench_index_maintenance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Index_Cell_Update");
    group.bench_function("set_indexed_cell", |b| {
        let (mut table, tuples) = setup_populated_table(10_000);
        table.create_index("id").unwrap();
        table.index("id").unwrap();
        let mut i = 0i32;
        b.iter(|| {
            let tuple = tuples[(i as usize * 37) % tuples.len()];
            table.set_int(tuple, "id", black_box(i % 1000)).unwrap();
            i += 1;
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_append,
    bench_filtered_iteration,
    bench_index_range_query,
    bench_index_maintenance
);
criterion_main!(benches);
