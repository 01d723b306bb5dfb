//! Marshaling benchmarks
//!
//! Measures value conversion in both directions and proxy dispatch overhead.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use luapy::{push_foreign, to_foreign};
use mlua::{Lua, Table, Value};
use pyo3::{Python, ToPyObject};

fn setup() -> Lua {
    let lua = Lua::new();
    let python = luapy::open(&lua).unwrap();
    lua.globals().set("python", python).unwrap();
    lua
}

fn sequence(lua: &Lua, len: usize) -> Table {
    let table = lua.create_table().unwrap();
    for i in 1..=len {
        table.raw_set(i, i as i64).unwrap();
    }
    table
}

fn bench_table_to_python(c: &mut Criterion) {
    let lua = setup();
    let mut group = c.benchmark_group("table_to_python");

    for len in [10, 100, 1000] {
        let table = sequence(&lua, len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &table, |b, table| {
            b.iter(|| {
                Python::with_gil(|py| {
                    black_box(to_foreign(&lua, py, Value::Table(table.clone())).unwrap());
                })
            });
        });
    }

    group.finish();
}

fn bench_push_natives(c: &mut Criterion) {
    let lua = setup();
    let objects = Python::with_gil(|py| {
        py.eval("[42, 2.5, 'text', True, None]", None, None)
            .unwrap()
            .iter()
            .unwrap()
            .map(|item| item.unwrap().to_object(py))
            .collect::<Vec<pyo3::PyObject>>()
    });

    c.bench_function("push_natives", |b| {
        b.iter(|| {
            Python::with_gil(|py| {
                for obj in &objects {
                    black_box(push_foreign(&lua, py, obj.as_ref(py)).unwrap());
                }
            })
        });
    });
}

fn bench_proxy_dispatch(c: &mut Criterion) {
    let lua = setup();
    lua.load("bench_list = python.list({1, 2, 3, 4, 5})").exec().unwrap();
    let index = lua.load("return bench_list[3]").into_function().unwrap();
    let call = lua
        .load("return python.builtins.len(bench_list)")
        .into_function()
        .unwrap();

    c.bench_function("proxy_index", |b| {
        b.iter(|| black_box(index.call::<Value>(()).unwrap()));
    });
    c.bench_function("proxy_call", |b| {
        b.iter(|| black_box(call.call::<Value>(()).unwrap()));
    });
}

criterion_group!(benches, bench_table_to_python, bench_push_natives, bench_proxy_dispatch);
criterion_main!(benches);
