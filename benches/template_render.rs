//! Criterion measurements of template building and rendering, plus a full executor
//! round trip against an in-memory `SQLite` database for comparison.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sql_template::prelude::*;
use std::hint::black_box;

fn build_template(filters: usize) -> Template {
    let mut t = Template::new();
    t.sql("select id, name, age from people");
    for i in 0..filters {
        let keyword = if i == 0 { "where" } else { "and" };
        t.sql_with(&format!("{keyword} col{i}={{{{p{i}}}}}"), [i64::try_from(i).unwrap_or_default()])
            .expect("one value per placeholder");
    }
    t
}

fn template_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("template");
    for filters in [1_usize, 8, 32] {
        group.throughput(Throughput::Elements(filters as u64));
        group.bench_with_input(BenchmarkId::new("build", filters), &filters, |b, &n| {
            b.iter(|| black_box(build_template(n)));
        });

        let template = build_template(filters);
        group.bench_with_input(BenchmarkId::new("render", filters), &template, |b, t| {
            b.iter(|| black_box(t.render()));
        });
    }
    group.finish();
}

fn executor_round_trip(c: &mut Criterion) {
    let db = SqlExecutor::sqlite(&SqliteOptions::in_memory()).expect("in-memory sqlite");
    db.execute_sql("create table people (id int, name text, age int)")
        .expect("create table");
    for id in 0..100 {
        db.execute_update_with(
            "insert into people values ({{id}}, {{name}}, {{age}})",
            [
                SqlValue::from(id),
                SqlValue::Text(format!("person-{id}")),
                SqlValue::from(id % 90),
            ],
        )
        .expect("seed row");
    }

    c.bench_function("executor/query_int", |b| {
        let mut id = 0;
        b.iter(|| {
            id = (id + 1) % 100;
            let age = db
                .query_int(|t| {
                    t.sql("select age from people where id={{id}}").bind(1, id);
                    Ok(())
                })
                .expect("lookup");
            black_box(age);
        });
    });
}

criterion_group!(benches, template_render, executor_round_trip);
criterion_main!(benches);
