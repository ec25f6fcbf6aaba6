use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polyorm::{Condition, Dialect, ParamStyle, Query, QueryConfig, Row};

/// SELECT with `n` bound filters, ordered and paged.
fn build_select(dialect: Dialect, n: usize) -> Query {
    let mut query = Query::new("Orders", QueryConfig::new(dialect));
    for i in 0..n {
        query = query.filter(Condition::eq(format!("Col{i}"), format!("v{i}")));
    }
    query.order_by("Id").limit(20).offset(40)
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("grammar/select");

    for dialect in Dialect::ALL {
        for n in [1, 10, 50] {
            let query = build_select(dialect, n);
            group.bench_with_input(
                BenchmarkId::new(dialect.name(), n),
                &query,
                |b, query| {
                    b.iter(|| {
                        let sql = query.to_select().map(|e| e.render(ParamStyle::At));
                        black_box(sql)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_bulk_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("grammar/bulk_insert");

    for dialect in Dialect::ALL {
        for n in [10, 100, 1000] {
            let rows: Vec<Row> = (0..n)
                .map(|i| {
                    Row::new()
                        .with("Id", i as i64)
                        .with("Name", format!("name {i}"))
                        .with("Total", 1.5)
                })
                .collect();
            let query = Query::new("Orders", QueryConfig::new(dialect));
            group.bench_with_input(BenchmarkId::new(dialect.name(), n), &rows, |b, rows| {
                b.iter(|| black_box(query.grammar().bulk_insert(rows)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_bulk_insert);
criterion_main!(benches);
